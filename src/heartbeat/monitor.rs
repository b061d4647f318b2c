//! Heartbeat scheduling and failure detection
//!
//! The monitor decides when to send and how to read silence. It never
//! touches a clock: the caller passes `now` into every call.

use serde::Serialize;

use super::protocol::{check_heartbeat_timeout, Heartbeat, HeartbeatResponse};
use crate::failover::FailoverTrigger;
use crate::ids::Millis;
use crate::replication::{ReplicaConfig, ReplicaHealth, ReplicaState};

/// Per-direction heartbeat bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatMonitor {
    interval_ms: Millis,
    timeout_ms: Millis,
    last_sent: Option<Millis>,
    consecutive_misses: u32,
    sent: u64,
}

impl HeartbeatMonitor {
    pub fn new(config: &ReplicaConfig) -> Self {
        Self {
            interval_ms: config.heartbeat_interval_ms,
            timeout_ms: config.heartbeat_timeout_ms,
            last_sent: None,
            consecutive_misses: 0,
            sent: 0,
        }
    }

    /// A heartbeat is due once an interval has passed since the last one.
    pub fn is_due(&self, now: Millis) -> bool {
        match self.last_sent {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval_ms,
        }
    }

    /// Build the next heartbeat for `state` and mark it sent.
    pub fn prepare(&mut self, state: &ReplicaState, now: Millis) -> Heartbeat {
        self.last_sent = Some(now);
        self.sent += 1;
        Heartbeat::from_state(state, now)
    }

    /// Fold the peer's answer into the miss counter.
    pub fn record_response(&mut self, response: &HeartbeatResponse) {
        if response.is_reject() {
            self.consecutive_misses += 1;
        } else {
            self.consecutive_misses = 0;
        }
    }

    /// Heartbeat could not be delivered.
    pub fn record_miss(&mut self) {
        self.consecutive_misses += 1;
    }

    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }

    pub fn heartbeats_sent(&self) -> u64 {
        self.sent
    }

    /// Read `state`'s view of its peer.
    ///
    /// Healthy within two intervals of silence, degraded up to the timeout,
    /// dead after it.
    pub fn assess_peer_health(&self, state: &ReplicaState, now: Millis) -> ReplicaHealth {
        let silent_ms = now.saturating_sub(state.last_heartbeat());
        if silent_ms <= self.interval_ms.saturating_mul(2) {
            ReplicaHealth::Healthy
        } else if silent_ms <= self.timeout_ms {
            ReplicaHealth::degraded(format!("no heartbeat for {}ms", silent_ms))
        } else {
            ReplicaHealth::dead(
                state.last_heartbeat() + self.timeout_ms,
                format!("no heartbeat for {}ms", silent_ms),
            )
        }
    }

    /// Failover trigger for `state` if its peer has timed out.
    pub fn timeout_trigger(&self, state: &ReplicaState, now: Millis) -> Option<FailoverTrigger> {
        if check_heartbeat_timeout(state, now) {
            Some(FailoverTrigger::HeartbeatTimeout {
                last_seen: state.last_heartbeat(),
                timeout_at: state.last_heartbeat() + self.timeout_ms,
            })
        } else {
            None
        }
    }
}
