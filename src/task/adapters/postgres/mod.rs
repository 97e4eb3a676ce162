//! `PostgreSQL` adapters for task board persistence.
//!
//! Position transactions take one transaction-scoped advisory lock per
//! column key, in sorted order, and rely on the deferred
//! `(project_id, column_name, position)` unique constraint as the last line
//! against duplicate ranks.

mod authorization;
mod blocking;
mod errors;
mod models;
mod repository;
mod schema;

pub use authorization::PostgresProjectMembers;
pub use blocking::TaskPgPool;
pub use repository::{DEFAULT_LOCK_TIMEOUT, PostgresTaskRepository};
