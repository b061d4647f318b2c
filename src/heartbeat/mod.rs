//! Heartbeat subsystem
//!
//! Heartbeats carry epoch and log position between the two replicas. They
//! propagate newer epochs, reveal lag, and their absence is the main
//! failover trigger.

mod monitor;
mod protocol;

pub use monitor::HeartbeatMonitor;
pub use protocol::{check_heartbeat_timeout, process_heartbeat, Heartbeat, HeartbeatResponse};
