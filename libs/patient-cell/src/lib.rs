pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use models::{Patient, PatientError, UpdatePatientRequest};
pub use router::create_patient_router;
pub use services::PatientService;
