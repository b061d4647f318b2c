//! Replication subsystem
//!
//! A primary ships contiguous batches of its log to a secondary, which
//! appends them verbatim. The secondary's log is always a prefix of the
//! primary's: it may lag, but never skips, reorders, or invents entries.
//!
//! # Invariants Enforced
//!
//! - Epoch fencing: requests from another epoch are rejected outright
//! - Prefix rule: first new entry must be `last_applied_lsn + 1`
//! - Chain rule: shipped entries must link onto the local tail hash
//! - All-or-nothing: a rejected batch changes nothing
//!
//! Transport is not part of this module. Requests are values; the caller
//! moves them between replicas in order.

mod config;
mod errors;
mod receiver;
mod role;
mod sender;
mod snapshot_transfer;
mod state;

pub use config::{ConfigError, ConfigResult, ReplicaConfig};
pub use errors::{ReplicationError, ReplicationResult};
pub use receiver::{apply_replication, ReplicationResponse};
pub use role::{ReplicaHealth, ReplicaRole};
pub use sender::{build_request, ReplicationRequest};
pub use snapshot_transfer::{check_snapshot_eligibility, install_snapshot, SnapshotEligibility};
pub use state::ReplicaState;
