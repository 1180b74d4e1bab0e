// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cue-store: single-file SQLite persistence for the cue server.
//!
//! One connection per [`Store`] handle, serialized behind a mutex. All
//! multi-row state changes go through [`Store::transaction`]; read paths use
//! [`Store::with_conn`]. Repository modules are free functions over
//! `&Connection` so a transaction can compose writes across entities.

use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

pub mod artifacts;
pub mod executions;
pub mod findings;
pub mod logs;
pub mod migrations;
pub mod projects;
pub mod registry;
pub mod steps;
pub mod telemetry;

mod json;

#[cfg(test)]
mod test_util;

pub use artifacts::ArtifactMeta;
pub use executions::StepCounts;
pub use migrations::{Migration, MigrationError};
// repository functions take a bare connection so callers can compose
// multi-entity transactions
pub use rusqlite::Connection;

/// Bound on rusqlite's prepared-statement cache (keyed by SQL text).
const STATEMENT_CACHE_CAPACITY: usize = 64;

thread_local! {
    // Set while a transaction closure runs on this thread. A nested
    // `transaction` call on the same thread would otherwise deadlock on the
    // connection mutex; fail fast instead.
    static IN_TRANSACTION: Cell<bool> = const { Cell::new(false) };
}

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store at '{path}': {reason}")]
    Open { path: String, reason: String },

    #[error("store integrity check failed: {0}")]
    Corrupt(String),

    #[error("nested transactions are not permitted")]
    NestedTransaction,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed stored value: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Encoding(e.to_string())
    }
}

/// Options for [`Store::open`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Page-cache size in KiB (mapped to a negative `cache_size` pragma).
    pub cache_kib: u32,
    /// How long a writer waits on a locked database before giving up.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { cache_kib: 65_536, busy_timeout: Duration::from_secs(5) }
    }
}

/// Handle to the single-file database. Cheap to clone; all clones share one
/// serialized connection.
#[derive(Clone, Debug)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if absent) the database file in WAL mode with foreign
    /// keys enforced, then verify integrity with `quick_check`.
    pub fn open(path: &Path, options: StoreOptions) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::init(conn, &options)
    }

    /// In-memory store for tests. Skips the migration file lock.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Self::init(conn, &StoreOptions::default())
    }

    fn init(conn: Connection, options: &StoreOptions) -> Result<Self, StoreError> {
        conn.busy_timeout(options.busy_timeout)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "cache_size", -(options.cache_kib as i64))?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);

        let check: String =
            conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
        if check != "ok" {
            return Err(StoreError::Corrupt(check));
        }

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Run a read (or single-statement write) against the connection.
    /// Generic over the caller's error type so higher layers can use their
    /// own vocabulary inside the closure.
    pub fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Execute `f` inside one atomic transaction. On error nothing persists.
    /// Re-entrant calls from within a transaction closure fail fast.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        if IN_TRANSACTION.with(|t| t.get()) {
            return Err(E::from(StoreError::NestedTransaction));
        }
        let mut conn = self.conn.lock();
        IN_TRANSACTION.with(|t| t.set(true));
        let result = (|| {
            let tx = conn.transaction().map_err(StoreError::from)?;
            // on error the Transaction drop rolls back
            let value = f(&tx)?;
            tx.commit().map_err(StoreError::from)?;
            Ok(value)
        })();
        IN_TRANSACTION.with(|t| t.set(false));
        result
    }

    /// Trivial read proving the connection is alive.
    pub fn health_check(&self) -> bool {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(StoreError::from)
        })
        .map(|v| v == 1)
        .unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
