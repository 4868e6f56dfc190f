use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub role: Role,
    #[serde(default)]
    pub is_admin: bool,
    pub iat: u64,
    pub exp: u64,
}

/// Authenticated caller, stored in request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: Role,
}

impl User {
    pub fn patient(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: Role::Patient }
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self { id: username.into(), role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn actor(&self) -> Actor {
        match self.role {
            Role::Patient => Actor::Patient { patient_id: self.id.clone() },
            Role::Admin => Actor::Admin { username: self.id.clone() },
        }
    }
}

/// Role tag passed into every mutating appointment operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Patient { patient_id: String },
    Admin { username: String },
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin { .. })
    }

    pub fn owns(&self, patient_id: &str) -> bool {
        match self {
            Actor::Patient { patient_id: own } => own == patient_id,
            Actor::Admin { .. } => false,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Patient { patient_id } => write!(f, "patient:{}", patient_id),
            Actor::Admin { username } => write!(f, "admin:{}", username),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}
