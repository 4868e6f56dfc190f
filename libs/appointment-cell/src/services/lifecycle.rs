use tracing::{debug, warn};

use shared_models::auth::Actor;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, LifecycleAction};

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Status reached by applying `action` to `current`.
    pub fn validate_transition(
        &self,
        current: AppointmentStatus,
        action: LifecycleAction,
    ) -> Result<AppointmentStatus, AppointmentError> {
        let next = match (current, action) {
            (AppointmentStatus::WaitingApproval, LifecycleAction::Approve) => AppointmentStatus::Approved,
            (AppointmentStatus::Approved, LifecycleAction::MarkDone) => AppointmentStatus::Done,
            (AppointmentStatus::WaitingApproval | AppointmentStatus::Approved, LifecycleAction::Cancel) => {
                AppointmentStatus::Cancelled
            }
            (status, action) => {
                warn!("Invalid status transition attempted: {} -> {}", status, action);
                return Err(AppointmentError::InvalidTransition { status, action });
            }
        };

        debug!("Status transition validated: {} -> {}", current, next);
        Ok(next)
    }

    /// Actions the table allows from `current`; empty for terminal states.
    pub fn valid_actions(&self, current: AppointmentStatus) -> Vec<LifecycleAction> {
        [LifecycleAction::Approve, LifecycleAction::MarkDone, LifecycleAction::Cancel]
            .into_iter()
            .filter(|action| self.validate_transition(current, *action).is_ok())
            .collect()
    }

    /// Approve and mark-done are admin-only; cancel is open to admins and the
    /// owning patient.
    pub fn authorize(
        &self,
        actor: &Actor,
        action: LifecycleAction,
        appointment: &Appointment,
    ) -> Result<(), AppointmentError> {
        if actor.is_admin() {
            return Ok(());
        }

        match action {
            LifecycleAction::Approve | LifecycleAction::MarkDone => Err(AppointmentError::RoleRequired(
                "Administrator access required".to_string(),
            )),
            LifecycleAction::Cancel if actor.owns(&appointment.patient_id) => Ok(()),
            LifecycleAction::Cancel => {
                warn!("{} attempted to cancel appointment {} owned by {}",
                      actor, appointment.id, appointment.patient_id);
                Err(AppointmentError::PermissionDenied(action))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn appointment_owned_by(patient_id: &str) -> Appointment {
        Appointment {
            id: "abc123".to_string(),
            patient_id: patient_id.to_string(),
            doctor_id: 1,
            appointment_datetime: NaiveDate::from_ymd_opt(2026, 10, 20)
                .and_then(|d| d.and_hms_opt(10, 0, 0))
                .unwrap(),
            status: AppointmentStatus::WaitingApproval,
            notes: None,
            created_at: None,
        }
    }

    fn patient(id: &str) -> Actor {
        Actor::Patient { patient_id: id.to_string() }
    }

    fn admin() -> Actor {
        Actor::Admin { username: "root".to_string() }
    }

    #[test]
    fn test_transition_table() {
        let lifecycle = AppointmentLifecycleService::new();

        assert_eq!(
            lifecycle.validate_transition(AppointmentStatus::WaitingApproval, LifecycleAction::Approve).unwrap(),
            AppointmentStatus::Approved
        );
        assert_eq!(
            lifecycle.validate_transition(AppointmentStatus::Approved, LifecycleAction::MarkDone).unwrap(),
            AppointmentStatus::Done
        );
        assert_eq!(
            lifecycle.validate_transition(AppointmentStatus::WaitingApproval, LifecycleAction::Cancel).unwrap(),
            AppointmentStatus::Cancelled
        );
        assert_eq!(
            lifecycle.validate_transition(AppointmentStatus::Approved, LifecycleAction::Cancel).unwrap(),
            AppointmentStatus::Cancelled
        );
    }

    #[test]
    fn test_rejected_transitions() {
        let lifecycle = AppointmentLifecycleService::new();

        assert_matches!(
            lifecycle.validate_transition(AppointmentStatus::WaitingApproval, LifecycleAction::MarkDone),
            Err(AppointmentError::InvalidTransition { .. })
        );
        assert_matches!(
            lifecycle.validate_transition(AppointmentStatus::Approved, LifecycleAction::Approve),
            Err(AppointmentError::InvalidTransition { .. })
        );
        assert_matches!(
            lifecycle.validate_transition(AppointmentStatus::Done, LifecycleAction::Cancel),
            Err(AppointmentError::InvalidTransition { status: AppointmentStatus::Done, action: LifecycleAction::Cancel })
        );
    }

    #[test]
    fn test_terminal_states_have_no_actions() {
        let lifecycle = AppointmentLifecycleService::new();

        assert!(lifecycle.valid_actions(AppointmentStatus::Done).is_empty());
        assert!(lifecycle.valid_actions(AppointmentStatus::Cancelled).is_empty());
        assert_eq!(
            lifecycle.valid_actions(AppointmentStatus::WaitingApproval),
            vec![LifecycleAction::Approve, LifecycleAction::Cancel]
        );
        assert!(AppointmentStatus::Done.is_terminal());
    }

    #[test]
    fn test_cancel_authorization() {
        let lifecycle = AppointmentLifecycleService::new();
        let appointment = appointment_owned_by("pabc123");

        assert!(lifecycle.authorize(&patient("pabc123"), LifecycleAction::Cancel, &appointment).is_ok());
        assert!(lifecycle.authorize(&admin(), LifecycleAction::Cancel, &appointment).is_ok());
        assert_matches!(
            lifecycle.authorize(&patient("pzzz999"), LifecycleAction::Cancel, &appointment),
            Err(AppointmentError::PermissionDenied(LifecycleAction::Cancel))
        );
    }

    #[test]
    fn test_admin_only_actions() {
        let lifecycle = AppointmentLifecycleService::new();
        let appointment = appointment_owned_by("pabc123");

        for action in [LifecycleAction::Approve, LifecycleAction::MarkDone] {
            assert!(lifecycle.authorize(&admin(), action, &appointment).is_ok());
            assert_matches!(
                lifecycle.authorize(&patient("pabc123"), action, &appointment),
                Err(AppointmentError::RoleRequired(_))
            );
        }
    }
}
