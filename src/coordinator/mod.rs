//! Replica pair coordinator
//!
//! The unit an operator interacts with: one primary and one secondary,
//! each with its own log, driven step by step on a caller-supplied clock.
//!
//! # Invariants Enforced
//!
//! - `primary()` always names the replica holding Primary authority
//! - The primary commits only what the secondary has acknowledged
//! - Checkpoints never drop unacknowledged entries
//! - A deposed primary is fenced (Failed) before the new one serves

mod errors;
mod pair;
mod stats;

pub use errors::{CoordinatorError, CoordinatorResult};
pub use pair::Coordinator;
pub use stats::{CoordinatorStats, ReplicaSummary};
