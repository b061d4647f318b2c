//! Log snapshot installation
//!
//! A deposed or recovering replica cannot replicate its way back once its
//! history has diverged or the primary has truncated what it is missing.
//! It is instead reset to a verified copy of the primary's log and resumes
//! as a secondary strictly after the copied tail.
//!
//! Installation is all-or-nothing: every check runs before state or log
//! are replaced.

use super::errors::{ReplicationError, ReplicationResult};
use super::role::{ReplicaHealth, ReplicaRole};
use super::state::ReplicaState;
use crate::ids::{Lsn, Millis};
use crate::log::MessageLog;

/// Why a snapshot cannot be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEligibility {
    Eligible,
    /// Snapshot did not come from the current primary
    NotFromPrimary,
    /// Target still holds a serving role
    TargetServing,
    /// Snapshot chain does not verify
    IntegrityFailure(Lsn),
}

impl SnapshotEligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Check whether `snapshot`, taken from `source`, may replace `target`'s log.
pub fn check_snapshot_eligibility(
    target: &ReplicaState,
    source: &ReplicaState,
    snapshot: &MessageLog,
) -> SnapshotEligibility {
    if !source.is_primary() {
        return SnapshotEligibility::NotFromPrimary;
    }
    if !matches!(target.role(), ReplicaRole::Failed | ReplicaRole::Recovering) {
        return SnapshotEligibility::TargetServing;
    }
    if let Err(lsn) = snapshot.verify_chain() {
        return SnapshotEligibility::IntegrityFailure(lsn);
    }
    SnapshotEligibility::Eligible
}

/// Replace `target`'s log with a copy of the primary's and make it a
/// secondary in the primary's epoch.
///
/// Returns the LSN replication resumes after.
pub fn install_snapshot(
    target: &mut ReplicaState,
    target_log: &mut MessageLog,
    source: &ReplicaState,
    snapshot: &MessageLog,
    now: Millis,
) -> ReplicationResult<Lsn> {
    match check_snapshot_eligibility(target, source, snapshot) {
        SnapshotEligibility::Eligible => {}
        SnapshotEligibility::IntegrityFailure(lsn) => {
            return Err(ReplicationError::integrity(lsn, "snapshot chain does not verify"));
        }
        other => {
            return Err(ReplicationError::invalid_state(
                target.id(),
                format!("snapshot not eligible: {:?}", other),
            ));
        }
    }

    *target_log = snapshot.clone();
    target.set_role(ReplicaRole::Secondary);
    target.set_epoch(source.epoch());
    target.set_last_applied(target_log.last_lsn());
    target.set_last_committed(target_log.committed_lsn());
    target.set_health(ReplicaHealth::Healthy);
    target.touch_heartbeat(now);

    Ok(target.last_applied_lsn())
}
