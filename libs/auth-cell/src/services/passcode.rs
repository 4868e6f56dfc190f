use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{encode, SupabaseClient};
use shared_utils::ids::numeric_code;

use crate::models::{AuthError, Passcode};
use crate::services::delivery::PasscodeDelivery;

pub const PASSCODE_DIGITS: u32 = 6;

const MOBILE_PATTERN: &str = r"^\+?[0-9]{7,15}$";

/// Strips spaces and dashes, then checks the number against the accepted format.
pub fn normalize_mobile_number(raw: &str) -> Result<String, AuthError> {
    let mobile_number: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let pattern = Regex::new(MOBILE_PATTERN).map_err(|e| AuthError::ValidationError(e.to_string()))?;
    if !pattern.is_match(&mobile_number) {
        return Err(AuthError::InvalidMobile(raw.to_string()));
    }

    Ok(mobile_number)
}

fn is_well_formed_code(code: &str) -> bool {
    code.len() == PASSCODE_DIGITS as usize && code.chars().all(|c| c.is_ascii_digit())
}

pub struct PasscodeService {
    supabase: Arc<SupabaseClient>,
    delivery: PasscodeDelivery,
    ttl: Duration,
}

impl PasscodeService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), config)
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, config: &AppConfig) -> Self {
        Self {
            supabase,
            delivery: PasscodeDelivery::new(config),
            ttl: Duration::minutes(config.passcode_ttl_minutes),
        }
    }

    /// Replaces any previous passcode for the number and sends the new one.
    /// Delivery failures are logged; the stored passcode stays valid.
    pub async fn issue(&self, mobile_number: &str) -> Result<DateTime<Utc>, AuthError> {
        let mobile_number = normalize_mobile_number(mobile_number)?;
        let code = numeric_code(PASSCODE_DIGITS);
        let expires_at = Utc::now() + self.ttl;

        let row = json!({
            "mobile_number": mobile_number,
            "code": code,
            "verified": false,
            "expires_at": expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        });

        let stored: Vec<Passcode> = self.supabase
            .upsert("passcodes", "mobile_number", row)
            .await?;
        if stored.is_empty() {
            return Err(AuthError::EmptyResponse("passcode upsert".to_string()));
        }

        info!("Passcode issued for {}, expires at {}", mobile_number, expires_at);

        if let Err(e) = self.delivery.deliver(&mobile_number, &code, self.ttl.num_minutes()).await {
            warn!("Passcode delivery to {} failed: {}", mobile_number, e);
        }

        Ok(expires_at)
    }

    /// Consumes the passcode. The record is marked verified only when the code
    /// matches, has not expired and was not used before, in one conditional update.
    pub async fn verify(&self, mobile_number: &str, code: &str) -> Result<String, AuthError> {
        let mobile_number = normalize_mobile_number(mobile_number)?;
        let code = code.trim();

        if !is_well_formed_code(code) {
            debug!("Rejecting malformed passcode for {}", mobile_number);
            return Err(AuthError::InvalidPasscode);
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let path = format!(
            "passcodes?mobile_number=eq.{}&code=eq.{}&verified=is.false&expires_at=gt.{}",
            encode(&mobile_number),
            encode(code),
            encode(&now),
        );

        let consumed: Vec<Passcode> = self.supabase
            .update(&path, json!({ "verified": true }))
            .await?;

        if consumed.is_empty() {
            warn!("Passcode verification failed for {}", mobile_number);
            return Err(AuthError::InvalidPasscode);
        }

        debug!("Passcode verified for {}", mobile_number);
        Ok(mobile_number)
    }
}
