//! Adapter implementations of the task board ports.
//!
//! - [`memory`]: thread-safe in-memory adapters for tests and local runs
//! - [`postgres`]: Diesel-backed `PostgreSQL` persistence
//! - [`log_notifier`]: assignment notifier that writes to the tracing log

pub mod log_notifier;
pub mod memory;
pub mod postgres;
