//! Failover controller
//!
//! Owns the `FailoverState` for one pair and drives it through the
//! transition functions. It does not decide *whether* to fail over; that
//! is the detector's job. It never retries on its own.

use super::errors::{FailoverError, FailoverResult};
use super::protocol::{complete_failover, initiate_failover, FailoverOutcome};
use super::state::{FailoverState, FailoverTrigger};
use crate::ids::{Millis, ReplicaId};
use crate::replication::ReplicaState;

/// Failover controller
#[derive(Debug, Clone, Default)]
pub struct FailoverController {
    state: FailoverState,
    completed: u64,
}

impl FailoverController {
    /// Create a controller in Idle state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FailoverState {
        &self.state
    }

    /// Get the current state name for observability.
    pub fn state_name(&self) -> &'static str {
        self.state.state_name()
    }

    pub fn is_in_progress(&self) -> bool {
        self.state.is_in_progress()
    }

    /// Failovers that reached Complete.
    pub fn failovers_completed(&self) -> u64 {
        self.completed
    }

    /// Start promoting `candidate`.
    ///
    /// A finished attempt is cleared first. On success `candidate` is
    /// replaced by its promoted form; on rejection it is untouched and
    /// the controller records the failure.
    pub fn trigger(
        &mut self,
        candidate: &mut ReplicaState,
        trigger: FailoverTrigger,
        old_primary: ReplicaId,
        now: Millis,
    ) -> FailoverResult<()> {
        if let FailoverState::InProgress { new_primary, .. } = &self.state {
            return Err(FailoverError::AlreadyInProgress {
                new_primary: *new_primary,
            });
        }

        // Complete / Failed → Idle
        self.state = FailoverState::Idle;

        match initiate_failover(candidate, trigger, old_primary, now) {
            Ok((promoted, in_progress)) => {
                *candidate = promoted;
                self.state = in_progress;
                Ok(())
            }
            Err(err) => {
                self.state = FailoverState::Failed {
                    failed_at: now,
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }

    /// Finish the open failover for the promoted replica.
    pub fn complete(
        &mut self,
        promoted: &mut ReplicaState,
        now: Millis,
    ) -> FailoverResult<FailoverOutcome> {
        let (completed, done, outcome) = complete_failover(promoted, &self.state, now)?;
        *promoted = completed;
        self.state = done;
        self.completed += 1;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Epoch;
    use crate::replication::{ReplicaConfig, ReplicaRole};

    fn manual() -> FailoverTrigger {
        FailoverTrigger::ManualFailover {
            requester: "operator".into(),
            reason: "drill".into(),
        }
    }

    #[test]
    fn test_full_cycle() {
        let mut controller = FailoverController::new();
        let mut replica = ReplicaState::secondary(ReplicaId(2), ReplicaConfig::default(), 0);

        controller.trigger(&mut replica, manual(), ReplicaId(1), 100).unwrap();
        assert!(controller.is_in_progress());
        assert_eq!(replica.role(), ReplicaRole::Primary);

        let outcome = controller.complete(&mut replica, 300).unwrap();
        assert_eq!(outcome.recovery_time_ms(), 200);
        assert_eq!(controller.state_name(), "Complete");
        assert_eq!(controller.failovers_completed(), 1);
    }

    #[test]
    fn test_second_trigger_rejected_while_in_progress() {
        let mut controller = FailoverController::new();
        let mut replica = ReplicaState::secondary(ReplicaId(2), ReplicaConfig::default(), 0);
        controller.trigger(&mut replica, manual(), ReplicaId(1), 0).unwrap();

        let mut other = ReplicaState::secondary(ReplicaId(3), ReplicaConfig::default(), 0);
        let err = controller.trigger(&mut other, manual(), ReplicaId(1), 5).unwrap_err();
        assert_eq!(err, FailoverError::AlreadyInProgress { new_primary: ReplicaId(2) });
        assert_eq!(other.role(), ReplicaRole::Secondary);
        assert!(controller.is_in_progress());
    }

    #[test]
    fn test_invalid_candidate_moves_to_failed() {
        let mut controller = FailoverController::new();
        let mut replica = ReplicaState::primary(ReplicaId(1), ReplicaConfig::default(), 0);
        let before = replica.clone();

        assert!(controller.trigger(&mut replica, manual(), ReplicaId(2), 40).is_err());
        assert_eq!(replica, before);
        assert!(matches!(controller.state(), FailoverState::Failed { failed_at: 40, .. }));
    }

    #[test]
    fn test_retrigger_after_completion() {
        let mut controller = FailoverController::new();
        let mut b = ReplicaState::secondary(ReplicaId(2), ReplicaConfig::default(), 0);
        controller.trigger(&mut b, manual(), ReplicaId(1), 0).unwrap();
        controller.complete(&mut b, 10).unwrap();

        let mut a = ReplicaState::secondary(ReplicaId(1), ReplicaConfig::default(), 0);
        a.set_epoch(b.epoch());
        controller.trigger(&mut a, manual(), ReplicaId(2), 20).unwrap();
        assert_eq!(a.epoch(), Epoch(3));
    }

    #[test]
    fn test_complete_without_trigger() {
        let mut controller = FailoverController::new();
        let mut replica = ReplicaState::secondary(ReplicaId(2), ReplicaConfig::default(), 0);
        assert_eq!(
            controller.complete(&mut replica, 0).unwrap_err(),
            FailoverError::NotInProgress
        );
        assert_eq!(controller.failovers_completed(), 0);
    }
}
