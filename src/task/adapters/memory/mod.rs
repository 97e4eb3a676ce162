//! In-memory adapter implementations for testing.
//!
//! These adapters provide simple, thread-safe implementations suitable for
//! unit testing and single-process deployments without a database.

mod authorization;
mod notifier;
mod task;

pub use authorization::InMemoryProjectMembers;
pub use notifier::RecordingNotifier;
pub use task::InMemoryTaskRepository;
