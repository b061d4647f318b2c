//! Failover error types
//!
//! A failed precondition never mutates the replica. Once promotion has
//! happened there is nothing left to fail: RTO breaches are reported on
//! the success value.

use thiserror::Error;

use crate::ids::ReplicaId;

/// Failover error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailoverError {
    /// Replica cannot be promoted from its current role
    #[error("Invalid replica state for failover: {0}")]
    InvalidState(String),

    /// Completion requested with no failover in progress
    #[error("no failover in progress")]
    NotInProgress,

    /// A second trigger arrived while a promotion is still open
    #[error("failover to {new_primary} already in progress")]
    AlreadyInProgress { new_primary: ReplicaId },
}

/// Result type for failover operations
pub type FailoverResult<T> = Result<T, FailoverError>;
