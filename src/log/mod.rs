//! Message log subsystem
//!
//! The log is the single source of truth a secondary replays to reach the
//! primary's exact state.
//!
//! # Invariants Enforced
//!
//! - LSNs strictly increase by one per append, never reused
//! - Every entry links to its predecessor's SHA-256 hash
//! - Commit is a watermark: it never writes and never passes the tail
//! - Epochs never move backward inside one log

mod entry;
mod errors;
mod hash;
mod message_log;

pub use entry::{LogEntry, LogEntryType, Payload, Subsystem, ENTRY_OVERHEAD_BYTES};
pub use errors::{AppendError, AppendResult};
pub use hash::{compute_entry_hash, EntryHash};
pub use message_log::{LogStats, MessageLog};
