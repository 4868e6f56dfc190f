use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub mobile_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Profile fields a patient may change; the mobile number is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientListQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Mobile number {0} is already registered")]
    MobileTaken(String),

    #[error("Could not allocate a unique patient id")]
    IdExhausted,

    #[error("Store returned no rows for {0}")]
    EmptyResponse(String),

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::ValidationError(_) => AppError::InvalidInput(err.to_string()),
            PatientError::MobileTaken(_) => AppError::Conflict(err.to_string()),
            PatientError::IdExhausted => AppError::Internal(err.to_string()),
            PatientError::EmptyResponse(_) | PatientError::Database(_) => AppError::Database(err.to_string()),
        }
    }
}
