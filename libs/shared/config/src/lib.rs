use std::env;
use tracing::warn;

const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 60;
const DEFAULT_PASSCODE_TTL_MINUTES: i64 = 10;
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub passcode_ttl_minutes: i64,
    pub sms_gateway_url: String,
    pub sms_gateway_token: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            access_token_ttl_minutes: parse_or_default(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
            ),
            passcode_ttl_minutes: parse_or_default(
                "PASSCODE_EXPIRE_MINUTES",
                DEFAULT_PASSCODE_TTL_MINUTES,
            ),
            sms_gateway_url: env::var("SMS_GATEWAY_URL")
                .unwrap_or_else(|_| {
                    warn!("SMS_GATEWAY_URL not set, passcodes will only be logged");
                    String::new()
                }),
            sms_gateway_token: env::var("SMS_GATEWAY_TOKEN").unwrap_or_default(),
            bootstrap_admin: match (
                env::var("BOOTSTRAP_ADMIN_USERNAME"),
                env::var("BOOTSTRAP_ADMIN_PASSWORD"),
            ) {
                (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                    Some(BootstrapAdmin { username, password })
                }
                _ => None,
            },
            port: parse_or_default("PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_sms_gateway_configured(&self) -> bool {
        !self.sms_gateway_url.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "service-key".to_string(),
            jwt_secret: "secret".to_string(),
            access_token_ttl_minutes: 60,
            passcode_ttl_minutes: 10,
            sms_gateway_url: String::new(),
            sms_gateway_token: String::new(),
            bootstrap_admin: None,
            port: 3000,
        }
    }

    #[test]
    fn test_is_configured() {
        assert!(config().is_configured());

        let mut missing_secret = config();
        missing_secret.jwt_secret.clear();
        assert!(!missing_secret.is_configured());
    }

    #[test]
    fn test_sms_gateway_optional() {
        let mut config = config();
        assert!(!config.is_sms_gateway_configured());

        config.sms_gateway_url = "http://sms.local/send".to_string();
        assert!(config.is_sms_gateway_configured());
    }
}
