//! Scalar identifiers shared by every subsystem
//!
//! - `Lsn`: position of an entry in a replica's log, strictly +1 per append
//! - `Epoch`: generation counter, bumped exactly once per failover promotion
//! - `ReplicaId`: opaque identity assigned when a replica is constructed
//!
//! All three are totally ordered and `Copy`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Log sequence number.
///
/// `Lsn::ZERO` means "nothing appended / nothing applied". The first entry
/// of every log carries `Lsn(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lsn(pub u64);

impl Lsn {
    /// The empty position.
    pub const ZERO: Lsn = Lsn(0);

    /// Position immediately after this one.
    pub fn next(self) -> Lsn {
        Lsn(self.0 + 1)
    }

    /// Raw value.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Distance from `other` up to `self`, zero if `other` is ahead.
    pub fn saturating_distance(self, other: Lsn) -> u64 {
        self.0.saturating_sub(other.0)
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Leadership generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(pub u64);

impl Epoch {
    /// Epoch every freshly built replica pair starts in.
    pub const INITIAL: Epoch = Epoch(1);

    /// The epoch a promotion moves into.
    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }

    /// Raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Replica identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(pub u64);

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replica-{}", self.0)
    }
}

/// Milliseconds on whatever clock the caller drives transitions with.
pub type Millis = u64;
