use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{encode, SupabaseClient};
use shared_utils::ids::{short_code, SHORT_CODE_LEN};

use crate::models::{Patient, PatientError, UpdatePatientRequest};

const PATIENT_ID_PREFIX: &str = "p";
const MOBILE_UNIQUE: &str = "patients_mobile_number_key";
const PATIENT_PKEY: &str = "patients_pkey";
const MAX_ID_ATTEMPTS: usize = 10;
const MAX_PAGE_SIZE: u32 = 500;

pub struct PatientService {
    supabase: Arc<SupabaseClient>,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn get_patient(&self, patient_id: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("patients?id=eq.{}", encode(patient_id));
        let patients: Vec<Patient> = self.supabase.select(&path).await?;

        patients.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn find_by_mobile(&self, mobile_number: &str) -> Result<Option<Patient>, PatientError> {
        let path = format!("patients?mobile_number=eq.{}", encode(mobile_number));
        let patients: Vec<Patient> = self.supabase.select(&path).await?;

        Ok(patients.into_iter().next())
    }

    /// Returns the patient registered under `mobile_number`, creating one on first login.
    pub async fn find_or_create_by_mobile(&self, mobile_number: &str) -> Result<Patient, PatientError> {
        if let Some(existing) = self.find_by_mobile(mobile_number).await? {
            return Ok(existing);
        }

        for _ in 0..MAX_ID_ATTEMPTS {
            let patient_id = self.generate_patient_id().await?;
            let row = json!({
                "id": patient_id,
                "name": format!("Patient-{}", mobile_number),
                "mobile_number": mobile_number,
            });

            let created: Vec<Patient> = match self.supabase.insert("patients", row).await {
                Ok(rows) => rows,
                // Another login for the same number created the row first
                Err(e) if e.is_constraint(MOBILE_UNIQUE) => {
                    warn!("Patient for {} created concurrently, reloading", mobile_number);
                    return self.find_by_mobile(mobile_number).await?
                        .ok_or_else(|| PatientError::MobileTaken(mobile_number.to_string()));
                }
                Err(e) if e.is_constraint(PATIENT_PKEY) => {
                    debug!("Patient id {} claimed concurrently, retrying", patient_id);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let patient = created.into_iter().next()
                .ok_or_else(|| PatientError::EmptyResponse("patient insert".to_string()))?;

            info!("Patient {} registered", patient.id);
            return Ok(patient);
        }

        Err(PatientError::IdExhausted)
    }

    async fn generate_patient_id(&self) -> Result<String, PatientError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = format!("{}{}", PATIENT_ID_PREFIX, short_code(SHORT_CODE_LEN));
            let path = format!("patients?id=eq.{}&select=id", candidate);
            let existing: Vec<Value> = self.supabase.select(&path).await?;

            if existing.is_empty() {
                return Ok(candidate);
            }
            debug!("Patient id {} already taken, retrying", candidate);
        }

        Err(PatientError::IdExhausted)
    }

    pub async fn update_patient(
        &self,
        patient_id: &str,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient profile: {}", patient_id);

        let mut update_data = Map::new();

        if let Some(name) = request.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(PatientError::ValidationError("Name must not be empty".to_string()));
            }
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(email) = request.email {
            if !email.contains('@') {
                return Err(PatientError::ValidationError(format!("Invalid email: {}", email)));
            }
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update_data.insert("date_of_birth".to_string(), json!(date_of_birth));
        }
        if let Some(age) = request.age {
            if !(0..=150).contains(&age) {
                return Err(PatientError::ValidationError(format!("Invalid age: {}", age)));
            }
            update_data.insert("age".to_string(), json!(age));
        }
        if let Some(gender) = request.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }

        if update_data.is_empty() {
            return self.get_patient(patient_id).await;
        }

        let path = format!("patients?id=eq.{}", encode(patient_id));
        let updated: Vec<Patient> = self.supabase.update(&path, Value::Object(update_data)).await?;

        let patient = updated.into_iter().next().ok_or(PatientError::NotFound)?;
        info!("Patient {} profile updated", patient.id);
        Ok(patient)
    }

    /// Newest registrations first.
    pub async fn list_patients(&self, skip: u32, limit: u32) -> Result<Vec<Patient>, PatientError> {
        let path = format!(
            "patients?order=created_at.desc&offset={}&limit={}",
            skip,
            limit.min(MAX_PAGE_SIZE)
        );
        Ok(self.supabase.select(&path).await?)
    }
}
