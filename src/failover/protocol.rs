//! Failover transitions
//!
//! Both functions are pure: they take the replica by reference and hand
//! back the replacement values. The caller installs them. On error nothing
//! has been produced, so nothing needs undoing.

use serde::Serialize;

use super::errors::{FailoverError, FailoverResult};
use super::state::{FailoverState, FailoverTrigger};
use crate::ids::{Epoch, Millis, ReplicaId};
use crate::replication::{ReplicaHealth, ReplicaRole, ReplicaState};

/// Health reason recorded when promotion took longer than the RTO.
pub const RTO_EXCEEDED: &str = "RTO exceeded";

/// Result of a completed failover
///
/// Promotion cannot be undone, so there is no failure variant: an RTO
/// breach shows up as `within_rto == false` and degraded health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailoverOutcome {
    Success {
        new_primary: ReplicaId,
        old_primary: ReplicaId,
        epoch: Epoch,
        recovery_time_ms: Millis,
        within_rto: bool,
    },
}

impl FailoverOutcome {
    pub fn recovery_time_ms(&self) -> Millis {
        match self {
            Self::Success { recovery_time_ms, .. } => *recovery_time_ms,
        }
    }

    pub fn within_rto(&self) -> bool {
        match self {
            Self::Success { within_rto, .. } => *within_rto,
        }
    }
}

/// Promote `state` on behalf of `trigger`.
///
/// Only a Secondary may be promoted. The returned replica is Primary in
/// the next epoch; the returned failover state is `InProgress`.
pub fn initiate_failover(
    state: &ReplicaState,
    trigger: FailoverTrigger,
    old_primary: ReplicaId,
    now: Millis,
) -> FailoverResult<(ReplicaState, FailoverState)> {
    if state.role() != ReplicaRole::Secondary {
        return Err(FailoverError::InvalidState(format!(
            "{} is {}, only a secondary can be promoted",
            state.id(),
            state.role()
        )));
    }
    if state.id() == old_primary {
        return Err(FailoverError::InvalidState(format!(
            "{} cannot replace itself",
            state.id()
        )));
    }

    let mut promoted = state.clone();
    promoted.set_role(ReplicaRole::Primary);
    promoted.set_epoch(state.epoch().next());

    let failover = FailoverState::InProgress {
        trigger,
        started_at: now,
        new_primary: state.id(),
        old_primary,
    };
    Ok((promoted, failover))
}

/// Close an in-progress failover for the promoted replica.
pub fn complete_failover(
    state: &ReplicaState,
    failover: &FailoverState,
    now: Millis,
) -> FailoverResult<(ReplicaState, FailoverState, FailoverOutcome)> {
    let (started_at, new_primary, old_primary) = match failover {
        FailoverState::InProgress {
            started_at,
            new_primary,
            old_primary,
            ..
        } => (*started_at, *new_primary, *old_primary),
        _ => return Err(FailoverError::NotInProgress),
    };

    if state.id() != new_primary {
        return Err(FailoverError::InvalidState(format!(
            "{} is completing a failover that promoted {}",
            state.id(),
            new_primary
        )));
    }

    let recovery_time_ms = now.saturating_sub(started_at);
    let within_rto = recovery_time_ms <= state.config().rto_ms;

    let mut completed = state.clone();
    completed.set_health(if within_rto {
        ReplicaHealth::Healthy
    } else {
        ReplicaHealth::degraded(RTO_EXCEEDED)
    });

    let outcome = FailoverOutcome::Success {
        new_primary,
        old_primary,
        epoch: completed.epoch(),
        recovery_time_ms,
        within_rto,
    };
    let done = FailoverState::Complete {
        completed_at: now,
        new_primary,
        old_primary,
    };
    Ok((completed, done, outcome))
}
