use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use doctor_cell::models::{DoctorAvailability, SlotFlags};
use doctor_cell::services::slots::{normalize_to_slot, slot_index};
use doctor_cell::services::AvailabilityService;
use shared_database::{encode, SupabaseClient};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, DaySlots};

/// Longest range the slot listing resolves in one request.
pub const MAX_RANGE_DAYS: i64 = 62;

const DATETIME_FILTER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A slot that passed every booking check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookableSlot {
    pub slot: u8,
    pub starts_at: NaiveDateTime,
}

pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
    availability: AvailabilityService,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            availability: AvailabilityService::with_client(supabase.clone()),
            supabase,
        }
    }

    /// Resolves the slot, checks it is open and unclaimed, and returns its
    /// canonical start time.
    pub async fn ensure_bookable(
        &self,
        doctor_id: i64,
        requested: NaiveDateTime,
    ) -> Result<BookableSlot, AppointmentError> {
        let (slot, starts_at) = normalize_to_slot(requested)
            .map_err(|e| AppointmentError::InvalidTime(e.to_string()))?;

        debug!("Checking doctor {} slot {} at {}", doctor_id, slot, starts_at);

        if !self.availability.is_open(doctor_id, starts_at.date(), slot).await? {
            return Err(AppointmentError::SlotUnavailable { doctor_id, at: starts_at });
        }

        let existing = self.blocking_appointments_at(doctor_id, starts_at).await?;
        if let Some(holder) = find_blocking(&existing, doctor_id, starts_at) {
            warn!("Doctor {} slot at {} already held by appointment {}", doctor_id, starts_at, holder.id);
            return Err(AppointmentError::SlotTaken { doctor_id, at: starts_at });
        }

        Ok(BookableSlot { slot, starts_at })
    }

    /// Boolean form of [`ensure_bookable`](Self::ensure_bookable); store
    /// failures still propagate.
    pub async fn is_bookable(&self, doctor_id: i64, requested: NaiveDateTime) -> Result<bool, AppointmentError> {
        match self.ensure_bookable(doctor_id, requested).await {
            Ok(_) => Ok(true),
            Err(AppointmentError::InvalidTime(_))
            | Err(AppointmentError::SlotUnavailable { .. })
            | Err(AppointmentError::SlotTaken { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn blocking_appointments_at(
        &self,
        doctor_id: i64,
        at: NaiveDateTime,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "appointments?doctor_id=eq.{}&appointment_datetime=eq.{}&status={}",
            doctor_id,
            encode(&at.format(DATETIME_FILTER_FORMAT).to_string()),
            AppointmentStatus::blocking_filter(),
        );
        Ok(self.supabase.select(&path).await?)
    }

    async fn blocking_appointments_between(
        &self,
        doctor_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let from = start.and_hms_opt(0, 0, 0);
        let until = end.succ_opt().and_then(|next| next.and_hms_opt(0, 0, 0));
        let (Some(from), Some(until)) = (from, until) else {
            return Err(AppointmentError::ValidationError("Date range out of bounds".to_string()));
        };

        let path = format!(
            "appointments?doctor_id=eq.{}&appointment_datetime=gte.{}&appointment_datetime=lt.{}&status={}",
            doctor_id,
            encode(&from.format(DATETIME_FILTER_FORMAT).to_string()),
            encode(&until.format(DATETIME_FILTER_FORMAT).to_string()),
            AppointmentStatus::blocking_filter(),
        );
        Ok(self.supabase.select(&path).await?)
    }

    /// Per-date open and bookable flags for `doctor_id` over `start..=end`.
    pub async fn resolve_slots(
        &self,
        doctor_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DaySlots>, AppointmentError> {
        validate_range(start, end)?;
        self.availability.doctors().get_doctor(doctor_id).await?;

        let records = self.availability.list_availability(doctor_id, Some(start), Some(end)).await?;
        let booked = self.blocking_appointments_between(doctor_id, start, end).await?;

        debug!("Resolving slots for doctor {} from {} to {}: {} records, {} bookings",
               doctor_id, start, end, records.len(), booked.len());

        Ok(start
            .iter_days()
            .take_while(|date| *date <= end)
            .map(|date| {
                let record = records.iter().find(|r| r.date == date);
                day_slots(date, record, &booked)
            })
            .collect())
    }
}

/// First appointment holding `at` for `doctor_id` with a blocking status.
pub fn find_blocking(appointments: &[Appointment], doctor_id: i64, at: NaiveDateTime) -> Option<&Appointment> {
    appointments
        .iter()
        .find(|a| a.doctor_id == doctor_id && a.appointment_datetime == at && a.status.is_blocking())
}

/// Combines one day's stored flags with the blocking appointments of that day.
pub fn day_slots(date: NaiveDate, record: Option<&DoctorAvailability>, appointments: &[Appointment]) -> DaySlots {
    let open = record.map(|r| r.slots).unwrap_or_else(SlotFlags::closed);
    let mut bookable = open;

    for appointment in appointments.iter().filter(|a| a.status.is_blocking()) {
        let at = appointment.appointment_datetime;
        if at.date() != date {
            continue;
        }
        if let Ok(slot) = slot_index(at.hour(), at.minute()) {
            bookable.set(slot, false);
        }
    }

    DaySlots {
        date,
        configured: record.is_some(),
        open,
        bookable,
    }
}

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), AppointmentError> {
    if start > end {
        return Err(AppointmentError::ValidationError("start_date must not be after end_date".to_string()));
    }
    if end.succ_opt().is_none() {
        return Err(AppointmentError::ValidationError(format!("Date range out of bounds: {}", end)));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(AppointmentError::ValidationError(format!(
            "Date range must not exceed {} days", MAX_RANGE_DAYS
        )));
    }
    Ok(())
}
