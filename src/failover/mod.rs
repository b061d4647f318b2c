//! Failover subsystem
//!
//! Promotes the secondary when the primary is lost.
//!
//! # Invariants Enforced
//!
//! - Only a Secondary is promoted
//! - Every promotion starts a new epoch, fencing the old primary
//! - Promotion is irrevocable: once InProgress it can only complete
//! - Recovery time is measured against the configured RTO and reported,
//!   never turned into a failure

mod controller;
mod errors;
mod protocol;
mod state;

pub use controller::FailoverController;
pub use errors::{FailoverError, FailoverResult};
pub use protocol::{complete_failover, initiate_failover, FailoverOutcome, RTO_EXCEEDED};
pub use state::{FailoverState, FailoverTrigger};
