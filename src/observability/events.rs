//! Observable replication events
//!
//! Events are explicit and typed. Each maps to one stable upper-case name
//! and a fixed severity.

use std::fmt;

use super::logger::Severity;

/// Observable events in a replica pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    ConfigLoaded,

    // Log
    /// Entry appended on the primary
    ReplicaAppend,
    /// Entries dropped below a checkpoint
    LogTruncated,

    // Replication
    ReplicationApplied,
    ReplicationRejected,

    // Heartbeat
    HeartbeatRejected,
    /// Peer silent past the timeout
    HeartbeatTimeout,

    // Failover
    FailoverStart,
    FailoverComplete,
    /// Promotion finished but took longer than the RTO
    FailoverRtoExceeded,
    FailoverFailed,
    /// Deposed replica reinstalled as secondary
    ReplicaRejoined,

    /// A pair-level invariant does not hold
    InvariantViolation,

    // Drill
    DrillStart,
    DrillComplete,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::ReplicaAppend => "REPLICA_APPEND",
            Event::LogTruncated => "LOG_TRUNCATED",

            Event::ReplicationApplied => "REPLICATION_APPLIED",
            Event::ReplicationRejected => "REPLICATION_REJECTED",

            Event::HeartbeatRejected => "HEARTBEAT_REJECTED",
            Event::HeartbeatTimeout => "HEARTBEAT_TIMEOUT",

            Event::FailoverStart => "FAILOVER_BEGIN",
            Event::FailoverComplete => "FAILOVER_COMPLETE",
            Event::FailoverRtoExceeded => "FAILOVER_RTO_EXCEEDED",
            Event::FailoverFailed => "FAILOVER_FAILED",
            Event::ReplicaRejoined => "REPLICA_REJOINED",

            Event::InvariantViolation => "INVARIANT_VIOLATION",

            Event::DrillStart => "DRILL_BEGIN",
            Event::DrillComplete => "DRILL_COMPLETE",
        }
    }

    /// Severity the event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::ReplicaAppend | Event::ReplicationApplied => Severity::Trace,
            Event::ReplicationRejected
            | Event::HeartbeatRejected
            | Event::HeartbeatTimeout
            | Event::FailoverRtoExceeded => Severity::Warn,
            Event::FailoverFailed => Severity::Error,
            Event::InvariantViolation => Severity::Fatal,
            _ => Severity::Info,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
