//! Observability for barrier sessions
//!
//! - Structured JSON logging with typed events
//! - Atomic counters shared across sessions
//!
//! Observability is read-only: a failing log sink never changes the outcome
//! of a barrier.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
