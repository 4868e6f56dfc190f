pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    Doctor, DoctorAvailability, DoctorError, PartialSlotFlags, SlotFlags,
    AvailabilityAction, AvailabilityWriteResult, BulkAvailabilityRequest,
};
pub use services::{AvailabilityService, DoctorService};
