use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::AuthError;

#[derive(Debug, Serialize)]
struct SmsMessage<'a> {
    to: &'a str,
    message: String,
}

/// Sends passcodes through the SMS gateway, or logs them when none is configured.
pub struct PasscodeDelivery {
    client: Client,
    gateway_url: Option<String>,
    gateway_token: String,
}

impl PasscodeDelivery {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            gateway_url: config
                .is_sms_gateway_configured()
                .then(|| config.sms_gateway_url.clone()),
            gateway_token: config.sms_gateway_token.clone(),
        }
    }

    pub async fn deliver(&self, mobile_number: &str, code: &str, ttl_minutes: i64) -> Result<(), AuthError> {
        let Some(gateway_url) = &self.gateway_url else {
            info!("Passcode for {}: {} (no SMS gateway configured)", mobile_number, code);
            return Ok(());
        };

        let body = SmsMessage {
            to: mobile_number,
            message: format!("Your clinic login code is {}. It expires in {} minutes.", code, ttl_minutes),
        };

        debug!("Sending passcode to {} via {}", mobile_number, gateway_url);

        let mut request = self.client.post(gateway_url).json(&body);
        if !self.gateway_token.is_empty() {
            request = request.bearer_auth(&self.gateway_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            error!("SMS gateway rejected passcode for {}: {} - {}", mobile_number, status, response_text);
            return Err(AuthError::Delivery(format!("HTTP {}: {}", status, response_text)));
        }

        debug!("Passcode delivered to {}", mobile_number);
        Ok(())
    }
}
