//! Per-(project, column) mutual exclusion for position writes.
//!
//! Every operation that rewrites positions takes the guards for the columns
//! it touches before opening its store transaction. Keys are always locked
//! in sorted order, so two moves between the same pair of columns in
//! opposite directions cannot deadlock.

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{Instant, timeout_at};

use crate::task::domain::ColumnKey;

/// A column lock could not be taken before the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("timed out waiting for the lock on column {0}")]
pub struct ColumnLockTimeout(pub ColumnKey);

/// Registry of async mutexes keyed by (project, column).
#[derive(Debug, Default)]
pub struct ColumnLocks {
    locks: DashMap<ColumnKey, Arc<Mutex<()>>>,
}

impl ColumnLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every key in `keys` (duplicates are collapsed), waiting no
    /// later than `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnLockTimeout`] naming the first key that could not be
    /// locked in time. Guards already taken are released.
    pub async fn acquire(
        &self,
        keys: impl IntoIterator<Item = ColumnKey>,
        deadline: Instant,
    ) -> Result<ColumnGuard, ColumnLockTimeout> {
        let mut ordered: Vec<ColumnKey> = keys.into_iter().collect();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in &ordered {
            let mutex = self.mutex_for(key);
            let guard = timeout_at(deadline, mutex.lock_owned())
                .await
                .map_err(|_| ColumnLockTimeout(key.clone()))?;
            guards.push(guard);
        }
        Ok(ColumnGuard {
            keys: ordered,
            _guards: guards,
        })
    }

    /// Number of columns that have ever been locked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns `true` when no column has been locked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn mutex_for(&self, key: &ColumnKey) -> Arc<Mutex<()>> {
        // Clone out of the shard before awaiting so the map is never held
        // across a suspension point.
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Held column locks; dropping the guard releases them.
#[derive(Debug)]
pub struct ColumnGuard {
    keys: Vec<ColumnKey>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ColumnGuard {
    /// Returns the locked keys in acquisition order.
    #[must_use]
    pub fn keys(&self) -> &[ColumnKey] {
        &self.keys
    }
}
