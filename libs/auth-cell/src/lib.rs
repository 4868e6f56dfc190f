pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Admin, AuthError, PatientLoginResponse};
pub use router::auth_routes;
pub use services::{AdminService, PasscodeService, PatientLoginService};
