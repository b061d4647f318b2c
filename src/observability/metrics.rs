//! Metrics registry
//!
//! - Counters only, monotonic
//! - Reset only when the registry is created
//! - Safe to bump through a shared reference

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters for one replica pair
///
/// Relaxed ordering throughout: counters are observed, never synchronised on.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    appends: AtomicU64,
    entries_replicated: AtomicU64,
    replication_rejections: AtomicU64,
    /// Requests or heartbeats refused for carrying an old epoch
    epoch_fences: AtomicU64,
    heartbeats_sent: AtomicU64,
    heartbeats_rejected: AtomicU64,
    failovers: AtomicU64,
    rto_breaches: AtomicU64,
    rejoins: AtomicU64,
    checkpoints: AtomicU64,
    entries_truncated: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_appends(&self) {
        self.appends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_entries_replicated(&self, count: u64) {
        self.entries_replicated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_replication_rejections(&self) {
        self.replication_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_epoch_fences(&self) {
        self.epoch_fences.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_heartbeats_sent(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_heartbeats_rejected(&self) {
        self.heartbeats_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failovers(&self) {
        self.failovers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rto_breaches(&self) {
        self.rto_breaches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejoins(&self) {
        self.rejoins.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a checkpoint and how many entries it released.
    pub fn record_checkpoint(&self, truncated: u64) {
        self.checkpoints.fetch_add(1, Ordering::Relaxed);
        self.entries_truncated.fetch_add(truncated, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            appends: self.appends.load(Ordering::Relaxed),
            entries_replicated: self.entries_replicated.load(Ordering::Relaxed),
            replication_rejections: self.replication_rejections.load(Ordering::Relaxed),
            epoch_fences: self.epoch_fences.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            heartbeats_rejected: self.heartbeats_rejected.load(Ordering::Relaxed),
            failovers: self.failovers.load(Ordering::Relaxed),
            rto_breaches: self.rto_breaches.load(Ordering::Relaxed),
            rejoins: self.rejoins.load(Ordering::Relaxed),
            checkpoints: self.checkpoints.load(Ordering::Relaxed),
            entries_truncated: self.entries_truncated.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub appends: u64,
    pub entries_replicated: u64,
    pub replication_rejections: u64,
    pub epoch_fences: u64,
    pub heartbeats_sent: u64,
    pub heartbeats_rejected: u64,
    pub failovers: u64,
    pub rto_breaches: u64,
    pub rejoins: u64,
    pub checkpoints: u64,
    pub entries_truncated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_through_shared_ref() {
        let metrics = MetricsRegistry::new();
        let shared = &metrics;
        shared.increment_appends();
        shared.increment_appends();
        shared.add_entries_replicated(5);
        shared.record_checkpoint(3);
        shared.record_checkpoint(0);

        let snap = metrics.snapshot();
        assert_eq!(snap.appends, 2);
        assert_eq!(snap.entries_replicated, 5);
        assert_eq!(snap.checkpoints, 2);
        assert_eq!(snap.entries_truncated, 3);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = MetricsRegistry::new();
        metrics.increment_failovers();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["failovers"], 1);
        assert_eq!(json["rto_breaches"], 0);
    }
}
