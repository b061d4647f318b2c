//! Observability for the replica pair
//!
//! - Structured logging (JSON lines)
//! - Atomic counters
//! - Typed lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only: nothing here feeds back into state
//! 2. No async or background threads
//! 3. Deterministic output
//!
//! ```ignore
//! use replicore::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::FailoverStart, &[("trigger", "manual")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event with fields.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
