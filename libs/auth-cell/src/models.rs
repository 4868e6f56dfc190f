use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use patient_cell::models::{Patient, PatientError};
use shared_database::SupabaseError;
use shared_models::error::AppError;
use shared_utils::jwt::TokenError;

// ==============================================================================
// STORED RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passcode {
    pub id: i64,
    pub mobile_number: String,
    pub code: String,
    pub verified: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Admin row including the PHC hash; never serialized into a response.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_superadmin: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub is_superadmin: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<AdminRecord> for Admin {
    fn from(record: AdminRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            is_superadmin: record.is_superadmin,
            created_at: record.created_at,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PasscodeRequest {
    pub mobile_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub mobile_number: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminRegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_superadmin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientLoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub patient: Patient,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasscodeIssued {
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid mobile number: {0}")]
    InvalidMobile(String),

    #[error("Invalid or expired passcode")]
    InvalidPasscode,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Admin {0} already exists")]
    UsernameTaken(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Passcode delivery failed: {0}")]
    Delivery(String),

    #[error("Store returned no rows for {0}")]
    EmptyResponse(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidMobile(_) | AuthError::ValidationError(_) => AppError::InvalidInput(err.to_string()),
            AuthError::InvalidPasscode | AuthError::InvalidCredentials => AppError::Unauthenticated(err.to_string()),
            AuthError::UsernameTaken(_) => AppError::Conflict(err.to_string()),
            AuthError::Hashing(_) => AppError::Internal(err.to_string()),
            AuthError::Delivery(_) => AppError::ExternalService(err.to_string()),
            AuthError::Token(inner) => inner.into(),
            AuthError::Patient(inner) => inner.into(),
            AuthError::EmptyResponse(_) | AuthError::Database(_) => AppError::Database(err.to_string()),
        }
    }
}
