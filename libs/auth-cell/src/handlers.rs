use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;
use shared_utils::jwt::validate_token;

use crate::models::{AdminLoginRequest, AdminRegisterRequest, LoginRequest, PasscodeIssued, PasscodeRequest};
use crate::services::{AdminService, PasscodeService, PatientLoginService};

#[axum::debug_handler]
pub async fn request_passcode(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<PasscodeRequest>,
) -> Result<Json<PasscodeIssued>, AppError> {
    let expires_at = PasscodeService::new(&config).issue(&request.mobile_number).await?;

    Ok(Json(PasscodeIssued {
        message: "Passcode sent".to_string(),
        expires_at,
    }))
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let response = PatientLoginService::new(&config)
        .login(&request.mobile_number, &request.code)
        .await?;

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn admin_login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<Value>, AppError> {
    let token = AdminService::new(&config)
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(json!(token)))
}

#[axum::debug_handler]
pub async fn admin_register(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<AdminRegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    let admin = AdminService::new(&config).register(request).await?;

    Ok((StatusCode::CREATED, Json(json!(admin))))
}

#[axum::debug_handler]
pub async fn validate(
    State(config): State<Arc<AppConfig>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| AppError::Unauthenticated("Missing authorization header".to_string()))?;

    let user = validate_token(bearer.token(), &config.jwt_secret)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        role: user.role,
    }))
}
