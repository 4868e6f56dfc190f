use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use doctor_cell::models::{DoctorError, SlotFlags};
use shared_database::SupabaseError;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: i64,
    pub appointment_datetime: NaiveDateTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    WaitingApproval,
    Approved,
    Done,
    Cancelled,
}

impl AppointmentStatus {
    pub const BLOCKING: [AppointmentStatus; 2] = [AppointmentStatus::WaitingApproval, AppointmentStatus::Approved];

    /// Holds the slot against new bookings.
    pub fn is_blocking(&self) -> bool {
        Self::BLOCKING.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Done | AppointmentStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::WaitingApproval => "waiting_approval",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Done => "done",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// PostgREST `in.(...)` filter value for the blocking set.
    pub fn blocking_filter() -> String {
        let names: Vec<&str> = Self::BLOCKING.iter().map(AppointmentStatus::as_str).collect();
        format!("in.({})", names.join(","))
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Approve,
    MarkDone,
    Cancel,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Approve => write!(f, "approve"),
            LifecycleAction::MarkDone => write!(f, "mark done"),
            LifecycleAction::Cancel => write!(f, "cancel"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: i64,
    pub appointment_datetime: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotRangeQuery {
    pub doctor_id: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminAppointmentQuery {
    pub status: Option<AppointmentStatus>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

/// Open and bookable flags of one doctor's day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub configured: bool,
    pub open: SlotFlags,
    pub bookable: SlotFlags,
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Accepts a naive ISO-8601 date-time, or an RFC 3339 one whose offset is dropped.
pub fn parse_appointment_datetime(raw: &str) -> Result<NaiveDateTime, AppointmentError> {
    let raw = raw.trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
        .ok_or_else(|| AppointmentError::InvalidTime(format!("Invalid appointment_datetime: {}", raw)))
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Doctor {doctor_id} has no open slot at {at}")]
    SlotUnavailable { doctor_id: i64, at: NaiveDateTime },

    #[error("Slot at {at} is already booked for doctor {doctor_id}")]
    SlotTaken { doctor_id: i64, at: NaiveDateTime },

    #[error("Cannot {action} an appointment that is {status}")]
    InvalidTransition { status: AppointmentStatus, action: LifecycleAction },

    #[error("Not authorized to {0} this appointment")]
    PermissionDenied(LifecycleAction),

    #[error("{0}")]
    RoleRequired(String),

    #[error("Appointment {0} was modified concurrently")]
    ConcurrentModification(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Could not allocate a unique appointment id")]
    IdExhausted,

    #[error("Store returned no rows for {0}")]
    EmptyResponse(String),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidTime(_) | AppointmentError::ValidationError(_) => {
                AppError::InvalidInput(err.to_string())
            }
            AppointmentError::SlotUnavailable { .. }
            | AppointmentError::SlotTaken { .. }
            | AppointmentError::ConcurrentModification(_) => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidTransition { .. } => AppError::InvalidTransition(err.to_string()),
            AppointmentError::PermissionDenied(_) => AppError::PermissionDenied(err.to_string()),
            AppointmentError::RoleRequired(_) => AppError::Unauthorized(err.to_string()),
            AppointmentError::IdExhausted => AppError::Internal(err.to_string()),
            AppointmentError::Doctor(inner) => inner.into(),
            AppointmentError::EmptyResponse(_) | AppointmentError::Database(_) => AppError::Database(err.to_string()),
        }
    }
}
