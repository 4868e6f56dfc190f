use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::{AppConfig, BootstrapAdmin};
use shared_database::{encode, SupabaseClient};
use shared_models::auth::{AccessToken, Role};
use shared_utils::jwt::TokenIssuer;

use crate::models::{Admin, AdminRecord, AdminRegisterRequest, AuthError};
use crate::services::password::{hash_password, validate_password, verify_password};

const USERNAME_UNIQUE: &str = "admins_username_key";

pub struct AdminService {
    supabase: Arc<SupabaseClient>,
    issuer: TokenIssuer,
}

impl AdminService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), TokenIssuer::from_config(config))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, issuer: TokenIssuer) -> Self {
        Self { supabase, issuer }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminRecord>, AuthError> {
        let path = format!("admins?username=eq.{}", encode(username));
        let admins: Vec<AdminRecord> = self.supabase.select(&path).await?;
        Ok(admins.into_iter().next())
    }

    /// Unknown usernames and wrong passwords fail the same way.
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken, AuthError> {
        debug!("Admin login attempt: {}", username);

        let Some(admin) = self.find_by_username(username.trim()).await? else {
            warn!("Admin login failed: unknown username {}", username);
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &admin.password_hash)? {
            warn!("Admin login failed: wrong password for {}", admin.username);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issuer.issue(&admin.username, Role::Admin)?;
        info!("Admin {} logged in", admin.username);
        Ok(token)
    }

    pub async fn register(&self, request: AdminRegisterRequest) -> Result<Admin, AuthError> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(AuthError::ValidationError("Username must not be empty".to_string()));
        }
        validate_password(&request.password)?;

        if self.find_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }

        let row = json!({
            "username": username,
            "password_hash": hash_password(&request.password)?,
            "is_superadmin": request.is_superadmin,
        });

        let created: Vec<AdminRecord> = self.supabase
            .insert("admins", row)
            .await
            .map_err(|e| {
                if e.is_constraint(USERNAME_UNIQUE) {
                    AuthError::UsernameTaken(username.to_string())
                } else {
                    AuthError::Database(e)
                }
            })?;

        let admin = created.into_iter().next()
            .ok_or_else(|| AuthError::EmptyResponse("admin insert".to_string()))?;

        info!("Admin {} registered (superadmin: {})", admin.username, admin.is_superadmin);
        Ok(admin.into())
    }

    /// Creates the configured superadmin unless that username exists.
    /// Returns whether a record was created.
    pub async fn ensure_bootstrap_admin(&self, bootstrap: &BootstrapAdmin) -> Result<bool, AuthError> {
        if self.find_by_username(&bootstrap.username).await?.is_some() {
            debug!("Bootstrap admin {} already present", bootstrap.username);
            return Ok(false);
        }

        let request = AdminRegisterRequest {
            username: bootstrap.username.clone(),
            password: bootstrap.password.clone(),
            is_superadmin: true,
        };

        match self.register(request).await {
            Ok(_) => Ok(true),
            // Another instance created it between the lookup and the insert
            Err(AuthError::UsernameTaken(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
