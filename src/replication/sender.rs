//! Replication requests, source side
//!
//! The primary ships entries verbatim: same LSN, timestamp and hashes.
//! Order is preserved and nothing is re-encoded.

use serde::Serialize;

use super::errors::{ReplicationError, ReplicationResult};
use super::state::ReplicaState;
use crate::ids::{Epoch, Lsn, Millis, ReplicaId};
use crate::log::{LogEntry, MessageLog};

/// A batch of entries sent from a source replica to a target replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationRequest {
    pub source: ReplicaId,
    pub target: ReplicaId,
    /// Sender's epoch; the target rejects anything else
    pub epoch: Epoch,
    /// Contiguous, ascending entries (may be empty)
    pub entries: Vec<LogEntry>,
    /// Sender's commit watermark at send time
    pub prev_committed_lsn: Lsn,
    /// Sender's clock at send time
    pub sent_at: Millis,
}

impl ReplicationRequest {
    /// LSN of the first entry, if any.
    pub fn first_lsn(&self) -> Option<Lsn> {
        self.entries.first().map(|e| e.lsn)
    }

    /// LSN of the last entry, if any.
    pub fn last_lsn(&self) -> Option<Lsn> {
        self.entries.last().map(|e| e.lsn)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Slice the next batch out of the source log, starting at `from`.
///
/// At most `max_batch_entries` entries are taken. Only a primary ships
/// history, and entries already truncated cannot be shipped.
pub fn build_request(
    source: &ReplicaState,
    log: &MessageLog,
    target: ReplicaId,
    from: Lsn,
    now: Millis,
) -> ReplicationResult<ReplicationRequest> {
    if !source.is_primary() {
        return Err(ReplicationError::invalid_state(
            source.id(),
            format!("only a primary ships entries (role {})", source.role()),
        ));
    }

    if from < log.first_lsn() && from <= log.last_lsn() {
        return Err(ReplicationError::invalid_state(
            source.id(),
            format!(
                "entries from {} were truncated (first retained {}); target needs a snapshot",
                from,
                log.first_lsn()
            ),
        ));
    }

    let entries = log
        .entries_from(from)
        .take(source.config().max_batch_entries)
        .cloned()
        .collect();

    Ok(ReplicationRequest {
        source: source.id(),
        target,
        epoch: source.epoch(),
        entries,
        prev_committed_lsn: source.last_committed_lsn(),
        sent_at: now,
    })
}
