//! Replay error types
//!
//! A replay error stops the session where it stands. Nothing is skipped
//! and nothing is repaired: integrity failures go to an operator.

use thiserror::Error;

use crate::ids::{Lsn, Millis};

/// Replay error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("LSN discontinuity: expected {expected}, got {received}")]
    LsnDiscontinuity { expected: Lsn, received: Lsn },

    #[error("timestamp ordering violation at LSN {lsn}: {timestamp} < {previous}")]
    TimestampRegression {
        lsn: Lsn,
        timestamp: Millis,
        previous: Millis,
    },

    #[error("entry {lsn} is beyond replay target {target}")]
    BeyondTarget { lsn: Lsn, target: Lsn },

    #[error("log does not hold entries {from}..={to}")]
    MissingEntries { from: Lsn, to: Lsn },

    #[error("integrity violation at LSN {lsn}")]
    IntegrityViolation { lsn: Lsn },

    #[error("failed to apply entry {lsn}: {reason}")]
    ApplyFailed { lsn: Lsn, reason: String },
}

impl ReplayError {
    pub fn apply_failed(lsn: Lsn, reason: impl Into<String>) -> Self {
        Self::ApplyFailed {
            lsn,
            reason: reason.into(),
        }
    }

    /// Corruption rather than a caller mistake.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. })
    }
}

/// Result type for replay operations
pub type ReplayResult<T> = Result<T, ReplayError>;
