//! Failover state machine
//!
//! `Idle → InProgress → {Complete | Failed}`
//!
//! A new trigger resets a finished attempt (Complete or Failed) to Idle
//! before starting over. Nothing leaves InProgress except completion:
//! promotion is irrevocable once it has begun.

use serde::Serialize;

use crate::ids::{Millis, ReplicaId};
use crate::replication::ReplicaHealth;

/// What caused a failover
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailoverTrigger {
    HeartbeatTimeout { last_seen: Millis, timeout_at: Millis },
    ManualFailover { requester: String, reason: String },
    PrimaryCritical { health: ReplicaHealth },
    NetworkPartition { partition_at: Millis },
}

impl FailoverTrigger {
    /// Get trigger name for observability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeartbeatTimeout { .. } => "heartbeat_timeout",
            Self::ManualFailover { .. } => "manual",
            Self::PrimaryCritical { .. } => "primary_critical",
            Self::NetworkPartition { .. } => "network_partition",
        }
    }
}

/// Lifecycle of one failover attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailoverState {
    Idle,
    InProgress {
        trigger: FailoverTrigger,
        started_at: Millis,
        new_primary: ReplicaId,
        old_primary: ReplicaId,
    },
    Complete {
        completed_at: Millis,
        new_primary: ReplicaId,
        old_primary: ReplicaId,
    },
    Failed {
        failed_at: Millis,
        reason: String,
    },
}

impl Default for FailoverState {
    fn default() -> Self {
        Self::Idle
    }
}

impl FailoverState {
    /// Get the state name for observability.
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::InProgress { .. } => "InProgress",
            Self::Complete { .. } => "Complete",
            Self::Failed { .. } => "Failed",
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress { .. })
    }

    /// Replica being (or having been) promoted.
    pub fn new_primary(&self) -> Option<ReplicaId> {
        match self {
            Self::InProgress { new_primary, .. } | Self::Complete { new_primary, .. } => {
                Some(*new_primary)
            }
            Self::Idle | Self::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(FailoverState::default(), FailoverState::Idle);
        assert!(!FailoverState::Idle.is_in_progress());
    }

    #[test]
    fn test_new_primary_only_while_promoting() {
        let in_progress = FailoverState::InProgress {
            trigger: FailoverTrigger::NetworkPartition { partition_at: 5 },
            started_at: 5,
            new_primary: ReplicaId(2),
            old_primary: ReplicaId(1),
        };
        assert_eq!(in_progress.new_primary(), Some(ReplicaId(2)));
        assert_eq!(in_progress.state_name(), "InProgress");

        let failed = FailoverState::Failed { failed_at: 5, reason: "x".into() };
        assert_eq!(failed.new_primary(), None);
    }

    #[test]
    fn test_trigger_names() {
        let manual = FailoverTrigger::ManualFailover {
            requester: "ops".into(),
            reason: "maintenance".into(),
        };
        assert_eq!(manual.as_str(), "manual");
    }
}
