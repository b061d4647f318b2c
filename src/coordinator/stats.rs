//! Aggregate pair statistics

use serde::Serialize;

use crate::ids::{Epoch, Lsn, Millis, ReplicaId};
use crate::log::LogStats;
use crate::observability::MetricsSnapshot;
use crate::replication::ReplicaRole;

/// Running totals kept by the coordinator itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct Totals {
    pub entries_replicated: u64,
    pub replication_errors: u64,
    pub failovers: u64,
    pub last_latency_ms: Millis,
    pub max_latency_ms: Millis,
}

impl Totals {
    pub fn record_latency(&mut self, latency_ms: Millis) {
        self.last_latency_ms = latency_ms;
        self.max_latency_ms = self.max_latency_ms.max(latency_ms);
    }
}

/// Per-replica view in a stats snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicaSummary {
    pub id: ReplicaId,
    pub role: ReplicaRole,
    pub epoch: Epoch,
    pub health: &'static str,
    pub last_applied_lsn: Lsn,
    pub last_committed_lsn: Lsn,
    pub log: LogStats,
}

/// Point-in-time view of the whole pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    pub primary: ReplicaSummary,
    pub secondary: ReplicaSummary,
    pub replication_lag: u64,
    pub replication_healthy: bool,
    pub entries_replicated: u64,
    pub replication_errors: u64,
    pub failovers: u64,
    pub last_replication_latency_ms: Millis,
    pub max_replication_latency_ms: Millis,
    pub failover_state: &'static str,
    pub metrics: MetricsSnapshot,
}
