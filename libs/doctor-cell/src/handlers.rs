use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{parse_date, BulkAvailabilityRequest, CreateDoctorRequest};
use crate::services::{AvailabilityService, DoctorService};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctors = doctor_service
        .list_doctors(query.skip.unwrap_or(0), query.limit.unwrap_or(100))
        .await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state).get_doctor(doctor_id).await?;
    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_doctor_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
    Query(query): Query<AvailabilityRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let start = query.start_date.as_deref().map(parse_date).transpose()?;
    let end = query.end_date.as_deref().map(parse_date).transpose()?;

    let availability_service = AvailabilityService::new(&state);
    let doctor = availability_service.doctors().get_doctor(doctor_id).await?;
    let availability = availability_service.list_availability(doctor_id, start, end).await?;

    Ok(Json(json!({
        "doctor_id": doctor.id,
        "doctor_name": doctor.name,
        "availability": availability
    })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    let doctor = DoctorService::new(&state).create_doctor(request).await?;

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn set_doctor_availability(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<i64>,
    Json(request): Json<BulkAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let results = AvailabilityService::new(&state)
        .set_bulk_availability(doctor_id, request)
        .await?;

    Ok(Json(json!({
        "message": "Doctor availability updated successfully",
        "doctor_id": doctor_id,
        "results": results
    })))
}

#[axum::debug_handler]
pub async fn delete_doctor_availability(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path((doctor_id, date)): Path<(i64, String)>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let date = parse_date(&date)?;
    AvailabilityService::new(&state).delete_availability(doctor_id, date).await?;

    Ok(Json(json!({
        "message": format!("Availability deleted for doctor {} on {}", doctor_id, date)
    })))
}
