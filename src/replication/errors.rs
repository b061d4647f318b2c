//! Replication error types
//!
//! Every rejection leaves the target's state and log exactly as they were.
//! The caller decides what happens next:
//! - `LsnGap` / `ReplicationTimeout`: re-fetch and resend
//! - `EpochMismatch`: the sender's view of leadership is stale
//! - `IntegrityCheckFailed`: surface to an operator, never auto-repaired

use thiserror::Error;

use crate::ids::{Epoch, Lsn, Millis, ReplicaId};

/// Replication error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    /// Request was sent under a different leadership epoch
    #[error("epoch mismatch: local {local}, request {received}")]
    EpochMismatch { local: Epoch, received: Epoch },

    /// First new entry does not follow the last applied LSN
    #[error("lsn gap: expected {expected}, received {received}")]
    LsnGap { expected: Lsn, received: Lsn },

    /// Hash chain broken or history diverged
    #[error("integrity check failed at lsn {lsn}: {reason}")]
    IntegrityCheckFailed { lsn: Lsn, reason: String },

    /// Target cannot accept replication in its current role
    #[error("invalid replica state for {replica}: {reason}")]
    InvalidReplicaState { replica: ReplicaId, reason: String },

    /// Request arrived after the configured deadline
    #[error("replication timeout: request {age_ms}ms old, limit {limit_ms}ms")]
    ReplicationTimeout { age_ms: Millis, limit_ms: Millis },
}

impl ReplicationError {
    pub(crate) fn integrity(lsn: Lsn, reason: impl Into<String>) -> Self {
        Self::IntegrityCheckFailed {
            lsn,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_state(replica: ReplicaId, reason: impl Into<String>) -> Self {
        Self::InvalidReplicaState {
            replica,
            reason: reason.into(),
        }
    }

    /// Resending (possibly from a different LSN) can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LsnGap { .. } | Self::ReplicationTimeout { .. })
    }

    /// Requires operator intervention.
    pub fn requires_operator(&self) -> bool {
        matches!(self, Self::IntegrityCheckFailed { .. })
    }

    /// Stable name for log lines and metrics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::EpochMismatch { .. } => "epoch_mismatch",
            Self::LsnGap { .. } => "lsn_gap",
            Self::IntegrityCheckFailed { .. } => "integrity_check_failed",
            Self::InvalidReplicaState { .. } => "invalid_replica_state",
            Self::ReplicationTimeout { .. } => "replication_timeout",
        }
    }
}

/// Result type for replication operations
pub type ReplicationResult<T> = Result<T, ReplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ReplicationError::LsnGap { expected: Lsn(3), received: Lsn(5) }.is_retryable());
        assert!(ReplicationError::ReplicationTimeout { age_ms: 20, limit_ms: 10 }.is_retryable());
        assert!(!ReplicationError::EpochMismatch { local: Epoch(2), received: Epoch(1) }.is_retryable());
    }

    #[test]
    fn test_integrity_requires_operator() {
        assert!(ReplicationError::integrity(Lsn(1), "bad").requires_operator());
        assert!(!ReplicationError::invalid_state(ReplicaId(1), "failed").requires_operator());
    }

    #[test]
    fn test_display_includes_positions() {
        let err = ReplicationError::LsnGap { expected: Lsn(4), received: Lsn(6) };
        assert_eq!(err.to_string(), "lsn gap: expected 4, received 6");
    }
}
