//! Coordinator error types

use thiserror::Error;

use crate::failover::FailoverError;
use crate::ids::{Lsn, ReplicaId};
use crate::log::AppendError;
use crate::replay::ReplayError;
use crate::replication::{ConfigError, ReplicaRole, ReplicationError};

/// Errors surfaced by the replica pair
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("primary and secondary share id {0}")]
    DuplicateReplicaId(ReplicaId),

    #[error("{replica} cannot accept writes as {role}")]
    NotWritable { replica: ReplicaId, role: ReplicaRole },

    #[error("append failed: {0}")]
    Append(#[from] AppendError),

    #[error("replication failed: {0}")]
    Replication(#[from] ReplicationError),

    #[error("failover failed: {0}")]
    Failover(#[from] FailoverError),

    #[error("replay failed: {0}")]
    Replay(#[from] ReplayError),

    #[error("invariant {invariant} violated on {replica} at LSN {lsn}")]
    InvariantViolation {
        replica: ReplicaId,
        invariant: &'static str,
        lsn: Lsn,
    },
}

impl CoordinatorError {
    /// Broken invariants and integrity failures are never auto-repaired.
    pub fn requires_operator(&self) -> bool {
        match self {
            Self::InvariantViolation { .. } => true,
            Self::Replication(e) => e.requires_operator(),
            Self::Append(e) => e.requires_operator(),
            Self::Replay(e) => e.is_integrity(),
            _ => false,
        }
    }
}

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
