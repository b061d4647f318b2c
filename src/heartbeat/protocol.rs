//! Heartbeat exchange
//!
//! - Lower epoch than ours: reject, change nothing
//! - Higher epoch: the sender won a newer failover; adopt its epoch
//! - Same epoch: compare positions and ask for missing entries

use serde::Serialize;

use crate::ids::{Epoch, Lsn, Millis, ReplicaId};
use crate::replication::{ReplicaRole, ReplicaState};

/// Liveness and position announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heartbeat {
    pub from: ReplicaId,
    pub epoch: Epoch,
    pub role: ReplicaRole,
    pub last_applied_lsn: Lsn,
    pub last_committed_lsn: Lsn,
    pub sent_at: Millis,
}

impl Heartbeat {
    /// Announce `state`'s current position.
    pub fn from_state(state: &ReplicaState, now: Millis) -> Self {
        Self {
            from: state.id(),
            epoch: state.epoch(),
            role: state.role(),
            last_applied_lsn: state.last_applied_lsn(),
            last_committed_lsn: state.last_committed_lsn(),
            sent_at: now,
        }
    }
}

/// Receiver's answer to a heartbeat
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HeartbeatResponse {
    Ack,
    /// Sender is ahead; ship entries starting at `from`
    NeedEntries { from: Lsn },
    Reject { reason: String },
}

impl HeartbeatResponse {
    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }
}

/// Process a heartbeat received by `state`.
pub fn process_heartbeat(
    state: &mut ReplicaState,
    heartbeat: &Heartbeat,
    now: Millis,
) -> HeartbeatResponse {
    if heartbeat.epoch < state.epoch() {
        return HeartbeatResponse::Reject {
            reason: "Stale epoch".to_string(),
        };
    }

    if heartbeat.epoch > state.epoch() {
        state.set_epoch(heartbeat.epoch);
        if state.is_primary() {
            // Deposed: our unreplicated suffix may diverge from the new primary
            state.set_role(ReplicaRole::Recovering);
        }
        state.touch_heartbeat(now);
        return HeartbeatResponse::Ack;
    }

    state.touch_heartbeat(now);
    if heartbeat.last_applied_lsn > state.last_applied_lsn() {
        HeartbeatResponse::NeedEntries {
            from: state.last_applied_lsn().next(),
        }
    } else {
        HeartbeatResponse::Ack
    }
}

/// True once the peer has been silent for longer than the timeout.
pub fn check_heartbeat_timeout(state: &ReplicaState, now: Millis) -> bool {
    now.saturating_sub(state.last_heartbeat()) > state.config().heartbeat_timeout_ms
}
