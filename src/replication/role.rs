//! Replica roles and health
//!
//! - Primary: sole writer, produces log entries
//! - Secondary: consumes the primary's log, eligible for promotion
//! - Witness: observes heartbeats, holds no log authority
//! - Recovering: replaying or resynchronising before it may serve
//! - Failed: observed terminal status, never a panic
//!
//! Health is observational. It never gates correctness; it feeds the
//! failure detector.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::Millis;

/// Role a replica currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicaRole {
    Primary,
    Secondary,
    Witness,
    Recovering,
    Failed,
}

impl ReplicaRole {
    /// Only the primary may append locally produced entries.
    pub fn can_write(&self) -> bool {
        matches!(self, Self::Primary)
    }

    /// Roles that accept replicated entries.
    pub fn accepts_replication(&self) -> bool {
        matches!(self, Self::Secondary | Self::Witness | Self::Recovering)
    }

    /// Get role name for observability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Witness => "witness",
            Self::Recovering => "recovering",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ReplicaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed replica health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaHealth {
    Healthy,
    Degraded(String),
    Critical(String),
    Dead { failed_at: Millis, reason: String },
}

impl ReplicaHealth {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded(reason.into())
    }

    pub fn critical(reason: impl Into<String>) -> Self {
        Self::Critical(reason.into())
    }

    pub fn dead(failed_at: Millis, reason: impl Into<String>) -> Self {
        Self::Dead {
            failed_at,
            reason: reason.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Critical or dead: grounds for a failover trigger.
    pub fn warrants_failover(&self) -> bool {
        matches!(self, Self::Critical(_) | Self::Dead { .. })
    }

    /// Reason text, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Healthy => None,
            Self::Degraded(r) | Self::Critical(r) => Some(r),
            Self::Dead { reason, .. } => Some(reason),
        }
    }

    /// Get health name for observability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded(_) => "degraded",
            Self::Critical(_) => "critical",
            Self::Dead { .. } => "dead",
        }
    }
}

impl Default for ReplicaHealth {
    fn default() -> Self {
        Self::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_primary_writes() {
        assert!(ReplicaRole::Primary.can_write());
        for role in [
            ReplicaRole::Secondary,
            ReplicaRole::Witness,
            ReplicaRole::Recovering,
            ReplicaRole::Failed,
        ] {
            assert!(!role.can_write());
        }
    }

    #[test]
    fn test_replication_targets() {
        assert!(ReplicaRole::Secondary.accepts_replication());
        assert!(ReplicaRole::Recovering.accepts_replication());
        assert!(!ReplicaRole::Primary.accepts_replication());
        assert!(!ReplicaRole::Failed.accepts_replication());
    }

    #[test]
    fn test_health_failover_grounds() {
        assert!(!ReplicaHealth::Healthy.warrants_failover());
        assert!(!ReplicaHealth::degraded("slow").warrants_failover());
        assert!(ReplicaHealth::critical("disk").warrants_failover());
        assert!(ReplicaHealth::dead(10, "gone").warrants_failover());
        assert_eq!(ReplicaHealth::dead(10, "gone").reason(), Some("gone"));
    }
}
