pub mod admin;
pub mod delivery;
pub mod login;
pub mod passcode;
pub mod password;

pub use admin::AdminService;
pub use delivery::PasscodeDelivery;
pub use login::PatientLoginService;
pub use passcode::PasscodeService;
