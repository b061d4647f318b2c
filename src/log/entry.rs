//! Log entry types
//!
//! A `LogEntry` is immutable once appended. Its `entry_hash` is derived from
//! every other field, so the only way to obtain a valid entry is through
//! `MessageLog::append` (or by copying one out of another log).

use serde::{Deserialize, Serialize};

use super::hash::{compute_entry_hash, EntryHash};
use crate::ids::{Epoch, Lsn, Millis};

/// Fixed per-entry overhead used by the byte-size estimate:
/// lsn + epoch + timestamp + type + subsystem + length + two hashes.
pub const ENTRY_OVERHEAD_BYTES: u64 = 8 + 8 + 8 + 1 + 1 + 8 + 32 + 32;

/// Kind of operation an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogEntryType {
    /// A state change produced by a subsystem
    StateMutation = 0,
    /// Checkpoint marker; entries before it may be truncated
    Checkpoint = 1,
    /// Replica configuration change
    ConfigChange = 2,
    /// Leadership moved to a new epoch
    EpochTransition = 3,
    /// Carries no state
    Noop = 4,
}

impl LogEntryType {
    /// Convert from u8, returns None for unknown values
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::StateMutation),
            1 => Some(Self::Checkpoint),
            2 => Some(Self::ConfigChange),
            3 => Some(Self::EpochTransition),
            4 => Some(Self::Noop),
            _ => None,
        }
    }

    /// Convert to u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Name for log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StateMutation => "state_mutation",
            Self::Checkpoint => "checkpoint",
            Self::ConfigChange => "config_change",
            Self::EpochTransition => "epoch_transition",
            Self::Noop => "noop",
        }
    }
}

/// Subsystem that produced a payload.
///
/// The log never interprets payload bytes; the tag only takes part in
/// hashing and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Subsystem {
    ProcessManager = 0,
    Scheduler = 1,
    CapabilitySystem = 2,
    Audit = 3,
    Accrual = 4,
    Replication = 5,
}

impl Subsystem {
    /// Convert to u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Opaque operation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Producing subsystem
    pub subsystem: Subsystem,
    /// Uninterpreted bytes
    pub data: Vec<u8>,
}

impl Payload {
    /// Create a payload.
    pub fn new(subsystem: Subsystem, data: impl Into<Vec<u8>>) -> Self {
        Self {
            subsystem,
            data: data.into(),
        }
    }

    /// Payload with no bytes, used by markers.
    pub fn empty(subsystem: Subsystem) -> Self {
        Self::new(subsystem, Vec::new())
    }
}

/// One record in a `MessageLog`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub lsn: Lsn,
    pub epoch: Epoch,
    pub timestamp: Millis,
    pub entry_type: LogEntryType,
    pub payload: Payload,
    /// Hash of the entry before this one (zero for genesis)
    pub prev_hash: EntryHash,
    /// Hash over every other field
    pub entry_hash: EntryHash,
}

impl LogEntry {
    /// Build an entry and seal it with its hash.
    pub(crate) fn sealed(
        lsn: Lsn,
        epoch: Epoch,
        timestamp: Millis,
        entry_type: LogEntryType,
        payload: Payload,
        prev_hash: EntryHash,
    ) -> Self {
        let entry_hash =
            compute_entry_hash(lsn, epoch, timestamp, entry_type, &payload, &prev_hash);
        Self {
            lsn,
            epoch,
            timestamp,
            entry_type,
            payload,
            prev_hash,
            entry_hash,
        }
    }

    /// Recompute the hash from the current field values.
    pub fn recompute_hash(&self) -> EntryHash {
        compute_entry_hash(
            self.lsn,
            self.epoch,
            self.timestamp,
            self.entry_type,
            &self.payload,
            &self.prev_hash,
        )
    }

    /// True if the stored hash matches the fields.
    pub fn verify_hash(&self) -> bool {
        self.recompute_hash() == self.entry_hash
    }

    /// Estimated in-memory footprint in bytes.
    pub fn size_estimate(&self) -> u64 {
        ENTRY_OVERHEAD_BYTES + self.payload.data.len() as u64
    }
}
