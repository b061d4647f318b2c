//! replicore - deterministic primary/secondary replication core
//!
//! An append-only, hash-chained message log plus the replication,
//! heartbeat and failover protocols that let a secondary rebuild the
//! primary's exact state and take over when the primary fails.
//!
//! Every transition is synchronous and reads no clock: callers pass the
//! current time in milliseconds.

pub mod cli;
pub mod coordinator;
pub mod failover;
pub mod heartbeat;
pub mod ids;
pub mod invariants;
pub mod log;
pub mod observability;
pub mod replay;
pub mod replication;
