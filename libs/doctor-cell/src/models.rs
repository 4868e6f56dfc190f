use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::error::AppError;

use crate::services::slots::SLOT_COUNT;

// ==============================================================================
// DOCTORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialization: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialization: String,
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// Open/closed flag for each of the sixteen daily slots, index 0 is slot 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotFlags([bool; SLOT_COUNT]);

impl SlotFlags {
    pub fn closed() -> Self {
        Self([false; SLOT_COUNT])
    }

    pub fn as_array(&self) -> &[bool; SLOT_COUNT] {
        &self.0
    }

    /// `slot` is 1-based; anything outside 1..=16 is closed.
    pub fn is_open(&self, slot: u8) -> bool {
        match slot {
            1..=16 => self.0[usize::from(slot) - 1],
            _ => false,
        }
    }

    pub fn set(&mut self, slot: u8, open: bool) {
        if (1..=16).contains(&slot) {
            self.0[usize::from(slot) - 1] = open;
        }
    }

    pub fn open_slots(&self) -> impl Iterator<Item = u8> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, open)| **open)
            .map(|(index, _)| index as u8 + 1)
    }

    pub fn open_count(&self) -> usize {
        self.0.iter().filter(|open| **open).count()
    }

    /// Reads the `slot1`..`slot16` columns of a stored row; missing columns are closed.
    pub fn from_columns(row: &Value) -> Self {
        let mut flags = [false; SLOT_COUNT];
        for (index, flag) in flags.iter_mut().enumerate() {
            *flag = row
                .get(column_name(index as u8 + 1))
                .and_then(Value::as_bool)
                .unwrap_or(false);
        }
        Self(flags)
    }

    pub fn to_columns(&self) -> Map<String, Value> {
        self.0
            .iter()
            .enumerate()
            .map(|(index, open)| (column_name(index as u8 + 1), Value::Bool(*open)))
            .collect()
    }
}

/// Only the flags a caller supplied; `None` leaves the stored flag untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialSlotFlags([Option<bool>; SLOT_COUNT]);

impl PartialSlotFlags {
    /// Parses `{"slot1": true, "slot7": false}`; any other key is rejected.
    pub fn parse(values: &BTreeMap<String, bool>) -> Result<Self, DoctorError> {
        let mut flags = [None; SLOT_COUNT];

        for (key, open) in values {
            let slot = key
                .strip_prefix("slot")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=16).contains(n))
                .ok_or_else(|| DoctorError::ValidationError(format!("Unknown slot key: {}", key)))?;
            flags[usize::from(slot) - 1] = Some(*open);
        }

        Ok(Self(flags))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn apply_to(&self, base: SlotFlags) -> SlotFlags {
        let mut merged = base;
        for (index, flag) in self.0.iter().enumerate() {
            if let Some(open) = flag {
                merged.set(index as u8 + 1, *open);
            }
        }
        merged
    }

    pub fn to_columns(&self) -> Map<String, Value> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(index, flag)| flag.map(|open| (column_name(index as u8 + 1), Value::Bool(open))))
            .collect()
    }
}

fn column_name(slot: u8) -> String {
    format!("slot{}", slot)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorAvailability {
    pub id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub slots: SlotFlags,
}

#[derive(Deserialize)]
struct AvailabilityKey {
    id: i64,
    doctor_id: i64,
    date: NaiveDate,
}

impl DoctorAvailability {
    pub fn from_row(row: &Value) -> Result<Self, DoctorError> {
        let key: AvailabilityKey = serde_json::from_value(row.clone())
            .map_err(SupabaseError::from)?;

        Ok(Self {
            id: key.id,
            doctor_id: key.doctor_id,
            date: key.date,
            slots: SlotFlags::from_columns(row),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityItem {
    pub date: String,
    #[serde(default)]
    pub slot_values: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAvailabilityRequest {
    pub availability: Vec<AvailabilityItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWriteResult {
    pub date: NaiveDate,
    pub action: AvailabilityAction,
    pub availability_id: i64,
    pub slots: SlotFlags,
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, DoctorError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| DoctorError::ValidationError(format!("Invalid date format: {}. Use YYYY-MM-DD", raw)))
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Availability not found for {0}")]
    AvailabilityNotFound(NaiveDate),

    #[error("Time {hour:02}:{minute:02} is outside the bookable day (09:00-16:30)")]
    SlotOutOfRange { hour: u32, minute: u32 },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Availability for {0} changed concurrently")]
    Conflict(NaiveDate),

    #[error("Store returned no rows for {0}")]
    EmptyResponse(String),

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound | DoctorError::AvailabilityNotFound(_) => AppError::NotFound(err.to_string()),
            DoctorError::SlotOutOfRange { .. } | DoctorError::ValidationError(_) => AppError::InvalidInput(err.to_string()),
            DoctorError::Conflict(_) => AppError::Conflict(err.to_string()),
            DoctorError::EmptyResponse(_) | DoctorError::Database(_) => AppError::Database(err.to_string()),
        }
    }
}
