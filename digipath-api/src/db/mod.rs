//! Content store
//!
//! Every mutating operation takes the store's write lock and runs in one
//! SQLite transaction: rules are checked against rows read inside that
//! transaction, and an early return drops (rolls back) the transaction.
//! Reads go straight to the pool.

use digipath_common::models::{SessionDetail, SessionStatus};
use digipath_common::Error;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

mod admins;
mod catalogue;
mod recordings;
mod rows;
mod sessions;
mod speakers;
mod tags;

pub use catalogue::{HomePage, HomeStats};
pub use sessions::SessionListing;

pub type Result<T> = digipath_common::Result<T>;

/// Session state change produced by a lifecycle operation
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub detail: SessionDetail,
    pub from: SessionStatus,
}

impl StatusChange {
    pub fn to(&self) -> SessionStatus {
        self.detail.session.status
    }
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

/// Write lock plus the transaction it guards
pub(crate) struct WriteTx<'a> {
    _guard: MutexGuard<'a, ()>,
    pub tx: Transaction<'static, Sqlite>,
}

impl WriteTx<'_> {
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Serialize writers and open a transaction
    pub(crate) async fn begin_write(&self) -> Result<WriteTx<'_>> {
        let guard = self.write_lock.lock().await;
        let tx = self.pool.begin().await?;
        Ok(WriteTx { _guard: guard, tx })
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else passes through
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Error {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => Error::Conflict(message.into()),
        _ => Error::Database(err),
    }
}

/// LIKE pattern matching `term` anywhere, with `\` as escape character
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" liver "), "%liver%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
