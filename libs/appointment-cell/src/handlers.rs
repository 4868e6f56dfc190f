use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use doctor_cell::models::parse_date;
use doctor_cell::services::slots::slot_labels;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_admin, require_patient};

use crate::models::{AdminAppointmentQuery, AppointmentError, BookAppointmentRequest, SlotRangeQuery};
use crate::services::booking::AppointmentBookingService;

const DEFAULT_RANGE_DAYS: i64 = 6;

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SlotRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let start = match query.start_date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => Utc::now().date_naive(),
    };
    let end = match query.end_date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => start
            .checked_add_signed(Duration::days(DEFAULT_RANGE_DAYS))
            .ok_or_else(|| AppointmentError::ValidationError(format!("Date range out of bounds: {}", start)))?,
    };

    let days = AppointmentBookingService::new(&state)
        .resolve_slots(query.doctor_id, start, end)
        .await?;

    Ok(Json(json!({
        "doctor_id": query.doctor_id,
        "slot_times": slot_labels(),
        "days": days
    })))
}

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_patient(&user)?;

    let appointment = AppointmentBookingService::new(&state)
        .book_appointment(&user.actor(), request)
        .await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let appointments = AppointmentBookingService::new(&state)
        .list_patient_appointments(&user.id)
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(&state)
        .get_appointment_for(&user.actor(), &appointment_id)
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(&state)
        .cancel_appointment(&user.actor(), &appointment_id)
        .await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointment = AppointmentBookingService::new(&state)
        .approve_appointment(&user.actor(), &appointment_id)
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointment = AppointmentBookingService::new(&state)
        .complete_appointment(&user.actor(), &appointment_id)
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_all_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<AdminAppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let appointments = AppointmentBookingService::new(&state)
        .list_all_appointments(query.status, query.skip.unwrap_or(0), query.limit.unwrap_or(100))
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}
