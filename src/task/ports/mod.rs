//! Port contracts for the task board.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod authorization;
pub mod notifier;
pub mod publisher;
pub mod repository;

pub use authorization::{AuthorizationError, TaskAuthorizer};
pub use notifier::{AssignmentNotification, AssignmentNotifier, NotificationError};
pub use publisher::{BoardEventPublisher, PublishReport};
pub use repository::{
    PositionTransaction, TaskRepository, TaskRepositoryError, TaskRepositoryResult,
};
