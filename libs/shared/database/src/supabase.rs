use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl SupabaseError {
    /// True when PostgREST rejected a write because of the named constraint.
    pub fn is_constraint(&self, constraint: &str) -> bool {
        match self {
            SupabaseError::Conflict(message) => message.contains(constraint),
            _ => false,
        }
    }
}

pub type SupabaseResult<T> = Result<T, SupabaseError>;

/// PostgREST client authenticated with the service key.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> SupabaseResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> SupabaseResult<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> SupabaseResult<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SupabaseError::Unauthorized(error_text),
                StatusCode::NOT_FOUND => SupabaseError::NotFound(error_text),
                StatusCode::CONFLICT => SupabaseError::Conflict(error_text),
                _ => SupabaseError::Api { status: status.as_u16(), message: error_text },
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    fn representation_headers(prefer: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static(prefer));
        headers
    }

    /// `GET /rest/v1/{path}` returning all matching rows.
    pub async fn select<T>(&self, path: &str) -> SupabaseResult<Vec<T>>
    where T: DeserializeOwned {
        self.request(Method::GET, &format!("/rest/v1/{}", path), None).await
    }

    pub async fn insert<T>(&self, table: &str, row: Value) -> SupabaseResult<Vec<T>>
    where T: DeserializeOwned {
        self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}", table),
            Some(row),
            Some(Self::representation_headers("return=representation")),
        ).await
    }

    /// Insert, or merge into the row that collides on `on_conflict`.
    pub async fn upsert<T>(&self, table: &str, on_conflict: &str, row: Value) -> SupabaseResult<Vec<T>>
    where T: DeserializeOwned {
        self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}?on_conflict={}", table, on_conflict),
            Some(row),
            Some(Self::representation_headers("resolution=merge-duplicates,return=representation")),
        ).await
    }

    /// `PATCH` every row matched by the filter in `path`; returns the updated rows.
    pub async fn update<T>(&self, path: &str, changes: Value) -> SupabaseResult<Vec<T>>
    where T: DeserializeOwned {
        self.request_with_headers(
            Method::PATCH,
            &format!("/rest/v1/{}", path),
            Some(changes),
            Some(Self::representation_headers("return=representation")),
        ).await
    }

    pub async fn delete<T>(&self, path: &str) -> SupabaseResult<Vec<T>>
    where T: DeserializeOwned {
        self.request_with_headers(
            Method::DELETE,
            &format!("/rest/v1/{}", path),
            None,
            Some(Self::representation_headers("return=representation")),
        ).await
    }

    /// Cheap round trip used by the health check.
    pub async fn ping(&self) -> SupabaseResult<()> {
        let _: Vec<Value> = self.select("doctors?select=id&limit=1").await?;
        Ok(())
    }
}

/// Percent-encodes a value for use inside a PostgREST filter.
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_detection() {
        let err = SupabaseError::Conflict(
            r#"{"code":"23505","message":"duplicate key value violates unique constraint \"appointments_slot_guard\""}"#.to_string(),
        );
        assert!(err.is_constraint("appointments_slot_guard"));
        assert!(!err.is_constraint("appointments_pkey"));
        assert!(!SupabaseError::NotFound("x".into()).is_constraint("appointments_slot_guard"));
    }

    #[test]
    fn test_encode_filter_values() {
        assert_eq!(encode("+353871234567"), "%2B353871234567");
        assert_eq!(encode("2026-10-20T10:00:00"), "2026-10-20T10%3A00%3A00");
    }
}
