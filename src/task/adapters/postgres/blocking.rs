//! Blocking operation helpers for the `PostgreSQL` adapters.
//!
//! Diesel is synchronous, so every call is moved onto Tokio's blocking
//! thread pool together with a pooled connection.

use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// Runs `f` with a pooled connection on the blocking thread pool.
///
/// `map_err` converts pool checkout and join failures into the caller's
/// error type.
pub(super) async fn run_blocking<F, T, E, M>(pool: &TaskPgPool, map_err: M, f: F) -> Result<T, E>
where
    F: FnOnce(&mut PgConnection) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    M: Fn(Box<dyn std::error::Error + Send + Sync>) -> E + Send + Sync + Copy + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = pool.get().map_err(|err| map_err(Box::new(err)))?;
        f(&mut connection)
    })
    .await
    .map_err(|err| map_err(Box::new(err)))?
}
