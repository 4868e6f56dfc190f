pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{Appointment, AppointmentError, AppointmentStatus, DaySlots, LifecycleAction};
pub use services::{AppointmentBookingService, AppointmentLifecycleService, ConflictDetectionService};
