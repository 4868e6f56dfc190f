use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Value, Map};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    parse_date, AvailabilityAction, AvailabilityWriteResult, BulkAvailabilityRequest,
    DoctorAvailability, DoctorError, PartialSlotFlags, SlotFlags,
};
use crate::services::doctor::DoctorService;

const UNIQUE_DOCTOR_DATE: &str = "doctor_availability_doctor_date_key";

/// Per-doctor, per-date slot calendar. A date without a record is fully closed.
pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    doctors: DoctorService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            doctors: DoctorService::with_client(supabase.clone()),
            supabase,
        }
    }

    pub async fn get_availability(
        &self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DoctorAvailability>, DoctorError> {
        debug!("Fetching availability for doctor {} on {}", doctor_id, date);

        let path = format!("doctor_availability?doctor_id=eq.{}&date=eq.{}", doctor_id, date);
        let rows: Vec<Value> = self.supabase.select(&path).await?;

        rows.first().map(DoctorAvailability::from_row).transpose()
    }

    /// Whether `slot` (1-based) is open for booking; absence of a record means closed.
    pub async fn is_open(&self, doctor_id: i64, date: NaiveDate, slot: u8) -> Result<bool, DoctorError> {
        let open = self.get_availability(doctor_id, date).await?
            .map(|availability| availability.slots.is_open(slot))
            .unwrap_or(false);

        debug!("Doctor {} slot {} on {} open: {}", doctor_id, slot, date, open);
        Ok(open)
    }

    /// Stored records between `start` and `end` inclusive, ordered by date.
    pub async fn list_availability(
        &self,
        doctor_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DoctorAvailability>, DoctorError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(DoctorError::ValidationError("start_date must not be after end_date".to_string()));
            }
        }

        let mut path = format!("doctor_availability?doctor_id=eq.{}&order=date.asc", doctor_id);
        if let Some(start) = start {
            path.push_str(&format!("&date=gte.{}", start));
        }
        if let Some(end) = end {
            path.push_str(&format!("&date=lte.{}", end));
        }

        let rows: Vec<Value> = self.supabase.select(&path).await?;
        rows.iter().map(DoctorAvailability::from_row).collect()
    }

    /// Creates the record for (doctor, date) or patches only the supplied flags
    /// of the existing one.
    pub async fn set_availability(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        flags: &PartialSlotFlags,
    ) -> Result<AvailabilityWriteResult, DoctorError> {
        match self.get_availability(doctor_id, date).await? {
            Some(existing) => self.update_existing(existing, flags).await,
            None => self.create_new(doctor_id, date, flags).await,
        }
    }

    async fn create_new(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        flags: &PartialSlotFlags,
    ) -> Result<AvailabilityWriteResult, DoctorError> {
        let slots = flags.apply_to(SlotFlags::closed());

        let mut row = slots.to_columns();
        row.insert("doctor_id".to_string(), Value::from(doctor_id));
        row.insert("date".to_string(), Value::from(date.to_string()));

        let created: Vec<Value> = self.supabase
            .insert("doctor_availability", Value::Object(row))
            .await
            .map_err(|e| {
                if e.is_constraint(UNIQUE_DOCTOR_DATE) {
                    warn!("Availability for doctor {} on {} created concurrently", doctor_id, date);
                    DoctorError::Conflict(date)
                } else {
                    DoctorError::Database(e)
                }
            })?;

        let availability = created.first()
            .map(DoctorAvailability::from_row)
            .transpose()?
            .ok_or_else(|| DoctorError::EmptyResponse("availability insert".to_string()))?;

        info!("Availability created for doctor {} on {} ({} open slots)",
              doctor_id, date, availability.slots.open_count());

        Ok(AvailabilityWriteResult {
            date,
            action: AvailabilityAction::Created,
            availability_id: availability.id,
            slots: availability.slots,
        })
    }

    async fn update_existing(
        &self,
        existing: DoctorAvailability,
        flags: &PartialSlotFlags,
    ) -> Result<AvailabilityWriteResult, DoctorError> {
        if flags.is_empty() {
            return Ok(AvailabilityWriteResult {
                date: existing.date,
                action: AvailabilityAction::Updated,
                availability_id: existing.id,
                slots: existing.slots,
            });
        }

        let path = format!("doctor_availability?id=eq.{}", existing.id);
        let changes: Map<String, Value> = flags.to_columns();
        let updated: Vec<Value> = self.supabase.update(&path, Value::Object(changes)).await?;

        // Deleted between the read and the patch
        let availability = updated.first()
            .map(DoctorAvailability::from_row)
            .transpose()?
            .ok_or(DoctorError::Conflict(existing.date))?;

        info!("Availability updated for doctor {} on {} ({} open slots)",
              availability.doctor_id, availability.date, availability.slots.open_count());

        Ok(AvailabilityWriteResult {
            date: availability.date,
            action: AvailabilityAction::Updated,
            availability_id: availability.id,
            slots: availability.slots,
        })
    }

    /// Applies a multi-date request. Every date and slot key is validated
    /// before the first write.
    pub async fn set_bulk_availability(
        &self,
        doctor_id: i64,
        request: BulkAvailabilityRequest,
    ) -> Result<Vec<AvailabilityWriteResult>, DoctorError> {
        self.doctors.get_doctor(doctor_id).await?;

        if request.availability.is_empty() {
            return Err(DoctorError::ValidationError("At least one availability entry is required".to_string()));
        }

        let entries = request.availability.iter()
            .map(|item| -> Result<_, DoctorError> {
                Ok((parse_date(&item.date)?, PartialSlotFlags::parse(&item.slot_values)?))
            })
            .collect::<Result<Vec<_>, DoctorError>>()?;

        let mut results = Vec::with_capacity(entries.len());
        for (date, flags) in entries {
            results.push(self.set_availability(doctor_id, date, &flags).await?);
        }

        Ok(results)
    }

    pub async fn delete_availability(&self, doctor_id: i64, date: NaiveDate) -> Result<(), DoctorError> {
        debug!("Deleting availability for doctor {} on {}", doctor_id, date);

        let path = format!("doctor_availability?doctor_id=eq.{}&date=eq.{}", doctor_id, date);
        let deleted: Vec<Value> = self.supabase.delete(&path).await?;

        if deleted.is_empty() {
            return Err(DoctorError::AvailabilityNotFound(date));
        }

        info!("Availability deleted for doctor {} on {}", doctor_id, date);
        Ok(())
    }

    pub fn doctors(&self) -> &DoctorService {
        &self.doctors
    }
}
