use std::sync::Arc;

use axum::{
    extract::State,
    Json,
    Router,
    routing::get,
};
use serde_json::{json, Value};
use tracing::error;

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::create_patient_router;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;

async fn healthcheck(State(config): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    SupabaseClient::new(&config).ping().await.map_err(|e| {
        error!("Health check failed: {}", e);
        AppError::ExternalService(format!("Store unreachable: {}", e))
    })?;

    Ok(Json(json!({ "status": "healthy" })))
}

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let probes = Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .route("/healthcheck", get(healthcheck))
        .with_state(state.clone());

    Router::new()
        .merge(probes)
        .nest("/auth", auth_routes(state.clone()))
        .nest("/patients", create_patient_router(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}
