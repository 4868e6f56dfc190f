use std::sync::Arc;

use tracing::info;

use patient_cell::services::PatientService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::Role;
use shared_utils::jwt::TokenIssuer;

use crate::models::{AuthError, PatientLoginResponse};
use crate::services::passcode::PasscodeService;

/// Passcode login: consume the code, resolve the patient, mint a token.
pub struct PatientLoginService {
    passcodes: PasscodeService,
    patients: PatientService,
    issuer: TokenIssuer,
}

impl PatientLoginService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), config)
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, config: &AppConfig) -> Self {
        Self {
            passcodes: PasscodeService::with_client(Arc::clone(&supabase), config),
            patients: PatientService::with_client(supabase),
            issuer: TokenIssuer::from_config(config),
        }
    }

    pub async fn login(&self, mobile_number: &str, code: &str) -> Result<PatientLoginResponse, AuthError> {
        let mobile_number = self.passcodes.verify(mobile_number, code).await?;
        let patient = self.patients.find_or_create_by_mobile(&mobile_number).await?;
        let token = self.issuer.issue(&patient.id, Role::Patient)?;

        info!("Patient {} logged in", patient.id);

        Ok(PatientLoginResponse {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            patient,
        })
    }
}
