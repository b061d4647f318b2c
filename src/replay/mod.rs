//! Deterministic replay
//!
//! # Invariants Enforced
//!
//! - Entries are replayed strictly in LSN order, one at a time
//! - Time never moves backward across replayed entries
//! - A replay never runs past its target
//! - Same range in, same result out

mod context;
mod engine;
mod errors;

pub use context::ReplayContext;
pub use engine::{ReplayApply, ReplayEngine, ReplayStats};
pub use errors::{ReplayError, ReplayResult};
