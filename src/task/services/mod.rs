//! Application services for task board orchestration.

mod board;
mod column_locks;
mod error;

pub use board::{
    BoardCollaborators, DEFAULT_MOVE_TIMEOUT, MoveOutcome, MoveTaskRequest, TaskBoardService,
    TaskFilter,
};
pub use column_locks::{ColumnGuard, ColumnLockTimeout, ColumnLocks};
pub use error::{ErrorKind, TaskBoardError, TaskBoardResult};
