//! SHA-256 chaining hash for log entries
//!
//! Every entry hash covers the canonical serialization of the entry
//! (lsn, epoch, timestamp, type, payload, prev_hash). Because `prev_hash`
//! is part of the input, a change to any earlier entry invalidates every
//! later hash.
//!
//! Canonical layout (all integers LE):
//! - lsn (u64)
//! - epoch (u64)
//! - timestamp (u64)
//! - entry type (u8)
//! - subsystem (u8)
//! - payload length (u64) + payload bytes
//! - prev_hash (32 bytes)

use serde::{Deserialize, Serialize};
use sha2::digest::Output;
use sha2::{Digest, Sha256};
use std::fmt;

use super::entry::{LogEntryType, Payload};
use crate::ids::{Epoch, Lsn, Millis};

/// 256-bit entry digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryHash(pub [u8; 32]);

impl EntryHash {
    /// Hash the genesis entry links to.
    pub const ZERO: EntryHash = EntryHash([0u8; 32]);

    /// Check for the genesis link.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        let digest: Output<Sha256> = self.0.into();
        format!("{:x}", digest)
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Debug for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryHash({})", self.short())
    }
}

impl fmt::Display for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the hash of an entry from its fields.
///
/// Deterministic: the same fields always produce the same digest.
pub fn compute_entry_hash(
    lsn: Lsn,
    epoch: Epoch,
    timestamp: Millis,
    entry_type: LogEntryType,
    payload: &Payload,
    prev_hash: &EntryHash,
) -> EntryHash {
    let mut hasher = Sha256::new();
    hasher.update(lsn.get().to_le_bytes());
    hasher.update(epoch.get().to_le_bytes());
    hasher.update(timestamp.to_le_bytes());
    hasher.update([entry_type.as_u8()]);
    hasher.update([payload.subsystem.as_u8()]);
    hasher.update((payload.data.len() as u64).to_le_bytes());
    hasher.update(&payload.data);
    hasher.update(prev_hash.0);
    EntryHash(hasher.finalize().into())
}
