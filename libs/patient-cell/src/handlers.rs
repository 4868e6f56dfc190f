use std::sync::Arc;
use axum::{
    extract::{Query, State, Extension},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_admin, require_patient};

use crate::models::{PatientListQuery, UpdatePatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn get_my_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let patient = PatientService::new(&config).get_patient(&user.id).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let patient = PatientService::new(&config).update_patient(&user.id, request).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let patients = PatientService::new(&config)
        .list_patients(query.skip.unwrap_or(0), query.limit.unwrap_or(100))
        .await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}
