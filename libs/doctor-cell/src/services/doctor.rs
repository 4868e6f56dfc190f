use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{CreateDoctorRequest, Doctor, DoctorError};

const MAX_PAGE_SIZE: u32 = 500;

pub struct DoctorService {
    supabase: Arc<SupabaseClient>,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn list_doctors(&self, skip: u32, limit: u32) -> Result<Vec<Doctor>, DoctorError> {
        let limit = limit.min(MAX_PAGE_SIZE);
        debug!("Listing doctors (skip {}, limit {})", skip, limit);

        let path = format!("doctors?order=id.asc&offset={}&limit={}", skip, limit);
        Ok(self.supabase.select(&path).await?)
    }

    pub async fn get_doctor(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("doctors?id=eq.{}", doctor_id);
        let doctors: Vec<Doctor> = self.supabase.select(&path).await?;

        doctors.into_iter().next().ok_or(DoctorError::NotFound)
    }

    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        let name = request.name.trim();
        let specialization = request.specialization.trim();

        if name.is_empty() || specialization.is_empty() {
            return Err(DoctorError::ValidationError(
                "Doctor name and specialization are required".to_string(),
            ));
        }

        let created: Vec<Doctor> = self.supabase.insert("doctors", json!({
            "name": name,
            "specialization": specialization
        })).await?;

        let doctor = created.into_iter().next()
            .ok_or_else(|| DoctorError::EmptyResponse("doctor insert".to_string()))?;

        info!("Doctor created with ID: {}", doctor.id);
        Ok(doctor)
    }
}
