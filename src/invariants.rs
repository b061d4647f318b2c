//! Structural invariant checks
//!
//! - LSN monotonicity: retained entries ascend by exactly one
//! - Hash chain: each entry's hash recomputes and links to its predecessor
//! - Single primary: a replica pair holds exactly one Primary
//!
//! These are pure observers. Callers decide whether a violation halts
//! writes or is surfaced to an operator; nothing here repairs anything.

use crate::ids::Lsn;
use crate::log::LogEntry;
use crate::replication::ReplicaRole;

/// Check that `entries` ascend by exactly one LSN each.
///
/// Returns the first LSN that breaks the sequence.
pub fn check_lsn_monotonic<'a, I>(entries: I) -> Result<(), Lsn>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut prev: Option<Lsn> = None;
    for entry in entries {
        if let Some(p) = prev {
            if entry.lsn != p.next() {
                return Err(entry.lsn);
            }
        }
        prev = Some(entry.lsn);
    }
    Ok(())
}

/// Check that every entry's hash recomputes and that each entry's
/// `prev_hash` equals its predecessor's `entry_hash`.
///
/// Returns the LSN of the first entry that fails.
pub fn check_hash_chain<'a, I>(entries: I) -> Result<(), Lsn>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut prev: Option<&LogEntry> = None;
    for entry in entries {
        if !entry.verify_hash() {
            return Err(entry.lsn);
        }
        if let Some(p) = prev {
            if entry.prev_hash != p.entry_hash {
                return Err(entry.lsn);
            }
        }
        prev = Some(entry);
    }
    Ok(())
}

/// True only for (Primary, Secondary) and (Secondary, Primary).
pub fn check_single_primary(a: ReplicaRole, b: ReplicaRole) -> bool {
    matches!(
        (a, b),
        (ReplicaRole::Primary, ReplicaRole::Secondary) | (ReplicaRole::Secondary, ReplicaRole::Primary)
    )
}
