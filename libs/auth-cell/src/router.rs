use std::sync::Arc;

use axum::{
    Router,
    routing::post,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/passcode", post(handlers::request_passcode))
        .route("/login", post(handlers::login))
        .route("/admin/login", post(handlers::admin_login))
        .route("/validate", post(handlers::validate));

    let protected_routes = Router::new()
        .route("/admin/register", post(handlers::admin_register))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
