use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_database::{encode, SupabaseClient};
use shared_models::auth::Actor;
use shared_utils::ids::{short_code, SHORT_CODE_LEN};

use crate::models::{
    parse_appointment_datetime, Appointment, AppointmentError, AppointmentStatus,
    BookAppointmentRequest, DaySlots, LifecycleAction,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;

const SLOT_GUARD: &str = "appointments_slot_guard";
const APPOINTMENT_PKEY: &str = "appointments_pkey";
const MAX_ID_ATTEMPTS: usize = 10;
const MAX_NOTES_LEN: usize = 1000;
const MAX_PAGE_SIZE: u32 = 500;

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    doctor_service: DoctorService,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            doctor_service: DoctorService::with_client(Arc::clone(&supabase)),
            conflict_service: ConflictDetectionService::new(Arc::clone(&supabase)),
            lifecycle_service: AppointmentLifecycleService::new(),
            supabase,
        }
    }

    /// Books a slot for the calling patient. The stored time is the slot start.
    pub async fn book_appointment(
        &self,
        actor: &Actor,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let Actor::Patient { patient_id } = actor else {
            return Err(AppointmentError::RoleRequired("Only patients can book appointments".to_string()));
        };

        let requested = parse_appointment_datetime(&request.appointment_datetime)?;
        let notes = normalize_notes(request.notes)?;

        info!("Booking appointment for patient {} with doctor {} at {}",
              patient_id, request.doctor_id, requested);

        self.doctor_service.get_doctor(request.doctor_id).await?;

        let slot = self.conflict_service.ensure_bookable(request.doctor_id, requested).await?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let appointment_id = self.generate_appointment_id().await?;
            let inserted = self
                .insert_appointment(&appointment_id, patient_id, request.doctor_id, slot.starts_at, notes.clone())
                .await?;

            if let Some(appointment) = inserted {
                info!("Appointment {} booked in slot {} with doctor {}",
                      appointment.id, slot.slot, appointment.doctor_id);
                return Ok(appointment);
            }
            debug!("Appointment id {} claimed concurrently, retrying", appointment_id);
        }

        Err(AppointmentError::IdExhausted)
    }

    async fn insert_appointment(
        &self,
        appointment_id: &str,
        patient_id: &str,
        doctor_id: i64,
        starts_at: NaiveDateTime,
        notes: Option<String>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let row = json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_datetime": starts_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "status": AppointmentStatus::WaitingApproval,
            "notes": notes,
        });

        let created: Vec<Appointment> = match self.supabase.insert("appointments", row).await {
            Ok(rows) => rows,
            // Id taken between the availability check and the insert
            Err(e) if e.is_constraint(APPOINTMENT_PKEY) => return Ok(None),
            Err(e) if e.is_constraint(SLOT_GUARD) => {
                warn!("Concurrent booking lost the race for doctor {} at {}", doctor_id, starts_at);
                return Err(AppointmentError::SlotTaken { doctor_id, at: starts_at });
            }
            Err(e) => return Err(e.into()),
        };

        created.into_iter().next()
            .map(Some)
            .ok_or_else(|| AppointmentError::EmptyResponse("appointment insert".to_string()))
    }

    async fn generate_appointment_id(&self) -> Result<String, AppointmentError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = short_code(SHORT_CODE_LEN);
            let path = format!("appointments?id=eq.{}&select=id", candidate);
            let existing: Vec<Value> = self.supabase.select(&path).await?;

            if existing.is_empty() {
                return Ok(candidate);
            }
            debug!("Appointment id {} already taken, retrying", candidate);
        }

        Err(AppointmentError::IdExhausted)
    }

    pub async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("appointments?id=eq.{}", encode(appointment_id));
        let appointments: Vec<Appointment> = self.supabase.select(&path).await?;

        appointments.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Owner or admin view; anyone else is told the appointment does not exist.
    pub async fn get_appointment_for(&self, actor: &Actor, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;

        if actor.is_admin() || actor.owns(&appointment.patient_id) {
            Ok(appointment)
        } else {
            Err(AppointmentError::NotFound)
        }
    }

    /// A patient's appointments, most recently booked first.
    pub async fn list_patient_appointments(&self, patient_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("appointments?patient_id=eq.{}&order=created_at.desc", encode(patient_id));
        Ok(self.supabase.select(&path).await?)
    }

    pub async fn list_all_appointments(
        &self,
        status: Option<AppointmentStatus>,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = format!(
            "appointments?order=appointment_datetime.desc&offset={}&limit={}",
            skip,
            limit.min(MAX_PAGE_SIZE)
        );
        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }

        Ok(self.supabase.select(&path).await?)
    }

    /// Applies a lifecycle action as a conditional update on the current status,
    /// so a concurrent change leaves the row untouched.
    pub async fn transition(
        &self,
        actor: &Actor,
        appointment_id: &str,
        action: LifecycleAction,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;

        self.lifecycle_service.authorize(actor, action, &current)?;
        let next = self.lifecycle_service.validate_transition(current.status, action)?;

        let path = format!(
            "appointments?id=eq.{}&status=eq.{}",
            encode(&current.id),
            current.status
        );
        let updated: Vec<Appointment> = self.supabase
            .update(&path, json!({ "status": next }))
            .await?;

        let appointment = updated
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::ConcurrentModification(current.id.clone()))?;

        info!("Appointment {} moved {} -> {} by {}", appointment.id, current.status, appointment.status, actor);
        Ok(appointment)
    }

    pub async fn approve_appointment(&self, actor: &Actor, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.transition(actor, appointment_id, LifecycleAction::Approve).await
    }

    pub async fn complete_appointment(&self, actor: &Actor, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.transition(actor, appointment_id, LifecycleAction::MarkDone).await
    }

    pub async fn cancel_appointment(&self, actor: &Actor, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.transition(actor, appointment_id, LifecycleAction::Cancel).await
    }

    pub async fn resolve_slots(
        &self,
        doctor_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DaySlots>, AppointmentError> {
        self.conflict_service.resolve_slots(doctor_id, start, end).await
    }
}

fn normalize_notes(notes: Option<String>) -> Result<Option<String>, AppointmentError> {
    let notes = notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(AppointmentError::ValidationError(format!(
            "Notes must not exceed {} characters", MAX_NOTES_LEN
        )));
    }

    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_normalize_notes() {
        assert_eq!(normalize_notes(None).unwrap(), None);
        assert_eq!(normalize_notes(Some("   ".to_string())).unwrap(), None);
        assert_eq!(normalize_notes(Some(" follow-up ".to_string())).unwrap(), Some("follow-up".to_string()));
        assert_matches!(
            normalize_notes(Some("x".repeat(MAX_NOTES_LEN + 1))),
            Err(AppointmentError::ValidationError(_))
        );
    }
}
