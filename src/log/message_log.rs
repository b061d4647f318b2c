//! Append-only, hash-chained message log
//!
//! Bounds:
//! - `first_lsn`: lowest LSN still retained (1 until something is truncated)
//! - `last_lsn`: highest LSN ever appended (0 when empty)
//! - `committed_lsn`: durability watermark, never above `last_lsn`
//!
//! Entries are stored and iterated in strictly increasing LSN order. The
//! tail hash survives truncation so the chain continues across checkpoints.

use serde::Serialize;
use std::collections::VecDeque;

use super::entry::{LogEntry, LogEntryType, Payload};
use super::errors::{AppendError, AppendResult};
use super::hash::EntryHash;
use crate::ids::{Epoch, Lsn, Millis};
use crate::invariants;

/// Retention statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    /// Entries currently retained
    pub current_entries: usize,
    /// Entries ever appended
    pub entries_appended: u64,
    /// Entries dropped by truncation
    pub entries_truncated: u64,
    /// Estimated bytes held by retained entries
    pub bytes_estimate: u64,
}

/// In-memory message log.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<LogEntry>,
    first_lsn: Lsn,
    last_lsn: Lsn,
    committed_lsn: Lsn,
    tail_hash: EntryHash,
    tail_epoch: Option<Epoch>,
    max_entries: usize,
    stats: LogStats,
}

impl MessageLog {
    /// Create an empty log retaining at most `max_entries`.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            first_lsn: Lsn(1),
            last_lsn: Lsn::ZERO,
            committed_lsn: Lsn::ZERO,
            tail_hash: EntryHash::ZERO,
            tail_epoch: None,
            max_entries,
            stats: LogStats::default(),
        }
    }

    pub fn first_lsn(&self) -> Lsn {
        self.first_lsn
    }

    pub fn last_lsn(&self) -> Lsn {
        self.last_lsn
    }

    pub fn committed_lsn(&self) -> Lsn {
        self.committed_lsn
    }

    /// Hash the next entry must link to.
    pub fn tail_hash(&self) -> EntryHash {
        self.tail_hash
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> LogStats {
        self.stats
    }

    /// Append a locally produced operation and return its LSN.
    pub fn append(
        &mut self,
        entry_type: LogEntryType,
        payload: Payload,
        epoch: Epoch,
        timestamp: Millis,
    ) -> AppendResult<Lsn> {
        self.check_capacity(1)?;

        let lsn = self.last_lsn.next();
        if let Some(tail_epoch) = self.tail_epoch {
            if epoch < tail_epoch {
                return Err(AppendError::invalid(
                    lsn,
                    format!("epoch {} is older than tail epoch {}", epoch, tail_epoch),
                ));
            }
        }

        let entry = LogEntry::sealed(lsn, epoch, timestamp, entry_type, payload, self.tail_hash);
        self.push(entry);
        Ok(lsn)
    }

    /// Check that `batch` could be appended verbatim, in order, without
    /// touching the log.
    pub fn check_batch(&self, batch: &[LogEntry]) -> AppendResult<()> {
        self.check_capacity(batch.len())?;

        let mut expected_lsn = self.last_lsn.next();
        let mut prev_hash = self.tail_hash;
        let mut tail_epoch = self.tail_epoch;

        for entry in batch {
            check_successor(entry, expected_lsn, &prev_hash, tail_epoch)?;
            expected_lsn = entry.lsn.next();
            prev_hash = entry.entry_hash;
            tail_epoch = Some(entry.epoch);
        }
        Ok(())
    }

    /// Append an entry produced by another replica, keeping its LSN,
    /// timestamp and hashes.
    pub fn append_replicated(&mut self, entry: LogEntry) -> AppendResult<Lsn> {
        self.check_capacity(1)?;
        check_successor(&entry, self.last_lsn.next(), &self.tail_hash, self.tail_epoch)?;
        let lsn = entry.lsn;
        self.push(entry);
        Ok(lsn)
    }

    /// Refuse with `LogFull` unless `incoming` more entries fit.
    pub fn check_capacity(&self, incoming: usize) -> AppendResult<()> {
        if self.entries.len() + incoming > self.max_entries {
            return Err(AppendError::LogFull {
                current: self.entries.len(),
                max: self.max_entries,
            });
        }
        Ok(())
    }

    fn push(&mut self, entry: LogEntry) {
        self.last_lsn = entry.lsn;
        self.tail_hash = entry.entry_hash;
        self.tail_epoch = Some(entry.epoch);
        self.stats.entries_appended += 1;
        self.stats.bytes_estimate += entry.size_estimate();
        self.entries.push_back(entry);
        self.stats.current_entries = self.entries.len();
    }

    /// Advance the commit watermark.
    ///
    /// Only moves forward, and never past `last_lsn`. Anything else is a
    /// no-op. Returns whether the watermark moved.
    pub fn commit_to_lsn(&mut self, lsn: Lsn) -> bool {
        if lsn > self.committed_lsn && lsn <= self.last_lsn {
            self.committed_lsn = lsn;
            true
        } else {
            false
        }
    }

    /// Entry at `lsn`, if retained.
    pub fn entry(&self, lsn: Lsn) -> Option<&LogEntry> {
        if lsn < self.first_lsn || lsn > self.last_lsn {
            return None;
        }
        self.entries.get((lsn.get() - self.first_lsn.get()) as usize)
    }

    /// Most recent entry, if retained.
    pub fn last_entry(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Retained entries with LSN ≥ `lsn`, ascending.
    pub fn entries_from(&self, lsn: Lsn) -> impl Iterator<Item = &LogEntry> + '_ {
        let skip = lsn.get().saturating_sub(self.first_lsn.get()) as usize;
        self.entries.iter().skip(skip)
    }

    /// Retained entries above the commit watermark.
    pub fn uncommitted_entries(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries_from(self.committed_lsn.next())
    }

    /// All retained entries, ascending.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    /// Drop entries with LSN below `lsn` after a checkpoint.
    ///
    /// `lsn` is clamped to `last_lsn + 1`; a value at or below `first_lsn`
    /// is a no-op. Returns the number of entries dropped. The caller must
    /// not truncate entries the peer has not acknowledged.
    pub fn truncate_before(&mut self, lsn: Lsn) -> usize {
        let lsn = lsn.min(self.last_lsn.next());
        if lsn <= self.first_lsn {
            return 0;
        }

        let drop_count = (lsn.get() - self.first_lsn.get()) as usize;
        for entry in self.entries.drain(..drop_count) {
            self.stats.bytes_estimate -= entry.size_estimate();
        }
        self.first_lsn = lsn;
        self.stats.entries_truncated += drop_count as u64;
        self.stats.current_entries = self.entries.len();
        drop_count
    }

    /// Recompute every retained hash and check the links between them.
    ///
    /// Returns the LSN of the first entry that fails.
    pub fn verify_chain(&self) -> Result<(), Lsn> {
        if let Some(first) = self.entries.front() {
            if first.lsn == Lsn(1) && !first.prev_hash.is_zero() {
                return Err(first.lsn);
            }
        }
        invariants::check_lsn_monotonic(self.entries.iter())?;
        invariants::check_hash_chain(self.entries.iter())?;
        match self.entries.back() {
            Some(last) if last.entry_hash != self.tail_hash => Err(last.lsn),
            _ => Ok(()),
        }
    }
}

fn check_successor(
    entry: &LogEntry,
    expected_lsn: Lsn,
    prev_hash: &EntryHash,
    tail_epoch: Option<Epoch>,
) -> AppendResult<()> {
    if entry.lsn != expected_lsn {
        return Err(AppendError::invalid(
            entry.lsn,
            format!("expected lsn {}", expected_lsn),
        ));
    }
    if let Some(tail_epoch) = tail_epoch {
        if entry.epoch < tail_epoch {
            return Err(AppendError::invalid(
                entry.lsn,
                format!("epoch {} is older than tail epoch {}", entry.epoch, tail_epoch),
            ));
        }
    }
    if entry.prev_hash != *prev_hash {
        return Err(AppendError::integrity(
            entry.lsn,
            format!("prev_hash {} does not match tail {}", entry.prev_hash.short(), prev_hash.short()),
        ));
    }
    if !entry.verify_hash() {
        return Err(AppendError::integrity(entry.lsn, "entry hash does not recompute"));
    }
    Ok(())
}
