use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Map, Value};

use shared_config::AppConfig;
use shared_models::auth::{JwtClaims, Role, User};

use crate::jwt::{sign, TokenIssuer};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub sms_gateway_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            sms_gateway_url: String::new(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            access_token_ttl_minutes: 60,
            passcode_ttl_minutes: 10,
            sms_gateway_url: self.sms_gateway_url.clone(),
            sms_gateway_token: String::new(),
            bootstrap_admin: None,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub role: Role,
}

impl TestUser {
    pub fn patient(id: &str) -> Self {
        Self { id: id.to_string(), role: Role::Patient }
    }

    pub fn admin(username: &str) -> Self {
        Self { id: username.to_string(), role: Role::Admin }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            role: self.role,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str) -> String {
        TokenIssuer::new(secret, 60)
            .issue(&user.id, user.role)
            .expect("test secret is never empty")
            .access_token
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        let now = Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id.clone(),
            role: user.role,
            is_admin: user.role == Role::Admin,
            iat: now - 7200,
            exp: now - 3600,
        };
        sign(&claims, secret).expect("test secret is never empty")
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret")
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    pub fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }
}

/// Row shapes as PostgREST returns them.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(doctor_id: i64, name: &str, specialization: &str) -> Value {
        json!({
            "id": doctor_id,
            "name": name,
            "specialization": specialization,
            "created_at": "2026-01-01T00:00:00+00:00"
        })
    }

    pub fn patient_response(patient_id: &str, mobile_number: &str) -> Value {
        json!({
            "id": patient_id,
            "name": format!("Patient-{}", mobile_number),
            "mobile_number": mobile_number,
            "email": null,
            "address": null,
            "date_of_birth": null,
            "age": null,
            "gender": null,
            "created_at": "2026-01-01T00:00:00+00:00"
        })
    }

    /// Availability row with the listed 1-based slots open.
    pub fn availability_response(id: i64, doctor_id: i64, date: NaiveDate, open_slots: &[usize]) -> Value {
        let mut row = Map::new();
        row.insert("id".to_string(), json!(id));
        row.insert("doctor_id".to_string(), json!(doctor_id));
        row.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        for slot in 1..=16 {
            row.insert(format!("slot{}", slot), json!(open_slots.contains(&slot)));
        }
        Value::Object(row)
    }

    pub fn appointment_response(
        appointment_id: &str,
        patient_id: &str,
        doctor_id: i64,
        at: NaiveDateTime,
        status: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_datetime": at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "status": status,
            "notes": null,
            "created_at": "2026-01-01T00:00:00+00:00"
        })
    }

    pub fn passcode_response(mobile_number: &str, code: &str, verified: bool) -> Value {
        json!({
            "id": 1,
            "mobile_number": mobile_number,
            "code": code,
            "verified": verified,
            "expires_at": (Utc::now() + chrono::Duration::minutes(10)).to_rfc3339(),
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn constraint_violation(constraint: &str) -> Value {
        json!({
            "code": "23505",
            "details": null,
            "hint": null,
            "message": format!("duplicate key value violates unique constraint \"{}\"", constraint)
        })
    }
}
