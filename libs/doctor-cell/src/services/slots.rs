//! Maps wall-clock times onto the clinic's sixteen half-hour slots.
//!
//! The bookable day runs 09:00-17:00. Slot 1 starts at 09:00, slot 16 at 16:30.

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use crate::models::DoctorError;

pub const SLOT_COUNT: usize = 16;
pub const SLOT_MINUTES: u32 = 30;
pub const FIRST_SLOT_HOUR: u32 = 9;
pub const LAST_SLOT_HOUR: u32 = 16;

/// 1-based slot number for `hour:minute`.
///
/// Hour 16 accepts minutes up to and including 30; the day closes at 17:00.
pub fn slot_index(hour: u32, minute: u32) -> Result<u8, DoctorError> {
    let out_of_range = hour < FIRST_SLOT_HOUR
        || hour > LAST_SLOT_HOUR
        || minute > 59
        || (hour == LAST_SLOT_HOUR && minute > SLOT_MINUTES);

    if out_of_range {
        return Err(DoctorError::SlotOutOfRange { hour, minute });
    }

    let mut index = (hour - FIRST_SLOT_HOUR) * 2 + 1;
    if minute >= SLOT_MINUTES {
        index += 1;
    }

    Ok(index as u8)
}

/// Start time of a 1-based slot, `None` outside 1..=16.
pub fn slot_start(slot: u8) -> Option<NaiveTime> {
    if !(1..=SLOT_COUNT as u8).contains(&slot) {
        return None;
    }
    let offset = u32::from(slot - 1) * SLOT_MINUTES;
    NaiveTime::from_hms_opt(FIRST_SLOT_HOUR + offset / 60, offset % 60, 0)
}

/// Resolves the slot of `at` and the canonical start of that slot on the same day.
pub fn normalize_to_slot(at: NaiveDateTime) -> Result<(u8, NaiveDateTime), DoctorError> {
    let slot = slot_index(at.hour(), at.minute())?;
    let start = slot_start(slot).ok_or(DoctorError::SlotOutOfRange {
        hour: at.hour(),
        minute: at.minute(),
    })?;
    Ok((slot, at.date().and_time(start)))
}

/// `"09:00"`, `"09:30"`, ... `"16:30"`.
pub fn slot_labels() -> Vec<String> {
    (1..=SLOT_COUNT as u8)
        .filter_map(slot_start)
        .map(|start| start.format("%H:%M").to_string())
        .collect()
}
