//! Log write errors

use thiserror::Error;

use crate::ids::Lsn;

/// Result type for log writes
pub type AppendResult<T> = Result<T, AppendError>;

/// Why an append was refused. The log is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppendError {
    /// Retention limit reached; truncate before appending more
    #[error("log full: {current} entries, limit {max}")]
    LogFull { current: usize, max: usize },

    /// Entry does not chain onto the tail, or its hash does not recompute
    #[error("integrity error at lsn {lsn}: {reason}")]
    IntegrityError { lsn: Lsn, reason: String },

    /// Entry is well formed but cannot follow the current tail
    #[error("invalid entry at lsn {lsn}: {reason}")]
    InvalidEntry { lsn: Lsn, reason: String },
}

impl AppendError {
    pub(crate) fn integrity(lsn: Lsn, reason: impl Into<String>) -> Self {
        Self::IntegrityError {
            lsn,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(lsn: Lsn, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            lsn,
            reason: reason.into(),
        }
    }

    /// Integrity failures are never repaired automatically.
    pub fn requires_operator(&self) -> bool {
        matches!(self, Self::IntegrityError { .. })
    }
}
