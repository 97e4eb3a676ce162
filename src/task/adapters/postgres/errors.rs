//! Mapping from Diesel failures to repository errors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::task::ports::TaskRepositoryError;

const LOCK_TIMEOUT_MESSAGE: &str = "lock timeout";

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        match &err {
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
                Self::SerializationFailure
            }
            DieselError::DatabaseError(_, info) if info.message().contains(LOCK_TIMEOUT_MESSAGE) => {
                Self::LockTimeout
            }
            _ => Self::persistence(err),
        }
    }
}

/// Wraps pool and join failures.
pub(super) fn infrastructure(err: Box<dyn std::error::Error + Send + Sync>) -> TaskRepositoryError {
    TaskRepositoryError::Persistence(err.into())
}
