use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{AccessToken, JwtClaims, JwtHeader, Role, User};
use shared_models::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("JWT secret is not set")]
    MissingSecret,

    #[error("Invalid token format")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid claims format")]
    InvalidClaims,

    #[error("Token expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret => AppError::Internal(err.to_string()),
            _ => AppError::Unauthenticated(err.to_string()),
        }
    }
}

/// Mints and validates HS256 bearer tokens with a fixed lifetime.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt_secret.clone(), config.access_token_ttl_minutes)
    }

    pub fn issue(&self, subject: &str, role: Role) -> Result<AccessToken, TokenError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: subject.to_string(),
            role,
            is_admin: role == Role::Admin,
            iat: now.timestamp().max(0) as u64,
            exp: (now + self.ttl).timestamp().max(0) as u64,
        };

        let token = sign(&claims, &self.secret)?;
        debug!("Issued {} token for {}", role, subject);

        Ok(AccessToken {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: self.ttl.num_seconds(),
        })
    }

    pub fn validate(&self, token: &str) -> Result<User, TokenError> {
        validate_token(token, &self.secret)
    }
}

/// Encodes and signs arbitrary claims. Exposed for fixtures that need
/// hand-crafted (for example already expired) tokens.
pub fn sign(claims: &JwtClaims, jwt_secret: &str) -> Result<String, TokenError> {
    if jwt_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let header = JwtHeader {
        alg: ALGORITHM.to_string(),
        typ: "JWT".to_string(),
    };

    let header_json = serde_json::to_vec(&header).map_err(|_| TokenError::InvalidClaims)?;
    let claims_json = serde_json::to_vec(claims).map_err(|_| TokenError::InvalidClaims)?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| TokenError::MissingSecret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature))
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, TokenError> {
    if jwt_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Malformed);
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        TokenError::Malformed
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| TokenError::MissingSecret)?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err(TokenError::InvalidSignature);
    }

    let header: JwtHeader = URL_SAFE_NO_PAD.decode(header_b64)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or(TokenError::Malformed)?;

    if header.alg != ALGORITHM {
        debug!("Unsupported token algorithm: {}", header.alg);
        return Err(TokenError::Malformed);
    }

    let claims: JwtClaims = URL_SAFE_NO_PAD.decode(claims_b64)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or(TokenError::InvalidClaims)?;

    if claims.is_admin != (claims.role == Role::Admin) {
        return Err(TokenError::InvalidClaims);
    }

    let now = Utc::now().timestamp().max(0) as u64;
    if claims.exp <= now {
        debug!("Token expired at {} (now: {})", claims.exp, now);
        return Err(TokenError::Expired);
    }

    let user = User {
        id: claims.sub,
        role: claims.role,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

    #[test]
    fn test_issue_then_validate() {
        let issuer = TokenIssuer::new(SECRET, 60);
        let token = issuer.issue("pabc123", Role::Patient).unwrap();

        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 3600);

        let user = issuer.validate(&token.access_token).unwrap();
        assert_eq!(user.id, "pabc123");
        assert_eq!(user.role, Role::Patient);
    }

    #[test]
    fn test_admin_flag_round_trips() {
        let issuer = TokenIssuer::new(SECRET, 60);
        let token = issuer.issue("root", Role::Admin).unwrap();
        let user = issuer.validate(&token.access_token).unwrap();
        assert!(user.is_admin());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenIssuer::new(SECRET, 60).issue("pabc123", Role::Patient).unwrap();
        let result = validate_token(&token.access_token, "another-secret");
        assert_eq!(result.unwrap_err(), TokenError::InvalidSignature);
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = JwtClaims {
            sub: "pabc123".to_string(),
            role: Role::Patient,
            is_admin: false,
            iat: 1_000,
            exp: 2_000,
        };
        let token = sign(&claims, SECRET).unwrap();
        assert_eq!(validate_token(&token, SECRET).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_forged_admin_flag_rejected() {
        let claims = JwtClaims {
            sub: "pabc123".to_string(),
            role: Role::Patient,
            is_admin: true,
            iat: 1_000,
            exp: u64::MAX / 2,
        };
        let token = sign(&claims, SECRET).unwrap();
        assert_eq!(validate_token(&token, SECRET).unwrap_err(), TokenError::InvalidClaims);
    }

    #[test]
    fn test_malformed_and_missing_secret() {
        assert_eq!(validate_token("invalid.token", SECRET).unwrap_err(), TokenError::Malformed);
        assert_eq!(validate_token("a.b.c", "").unwrap_err(), TokenError::MissingSecret);
        assert_eq!(
            TokenIssuer::new("", 60).issue("x", Role::Patient).unwrap_err(),
            TokenError::MissingSecret
        );
    }
}
