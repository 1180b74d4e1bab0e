// SPDX-License-Identifier: MIT

//! Ordered schema migrations with a cross-process file lock.
//!
//! Each version applies inside its own transaction and records itself in
//! `schema_migrations`. Concurrent processes racing to migrate the same
//! database path serialize on an exclusive lock next to the file; lock
//! acquisition retries with exponential backoff up to a configurable
//! timeout. Destructive migrations are never applied by the runner.

use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;
use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

use crate::{Store, StoreError};

/// One schema version.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
    /// Destructive migrations (drops, rewrites) require a manual run.
    pub destructive: bool,
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("could not acquire migration lock within {0:?}")]
    LockTimeout(Duration),

    #[error("migration lock file error: {0}")]
    LockFile(#[from] std::io::Error),

    #[error("migration {version} '{name}' is destructive and must be applied manually")]
    Destructive { version: i64, name: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for MigrationError {
    fn from(e: rusqlite::Error) -> Self {
        MigrationError::Store(StoreError::Sqlite(e))
    }
}

const BACKOFF_INITIAL: Duration = Duration::from_millis(100);
const BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Apply all unapplied migrations to the store backing `db_path`.
/// Returns how many versions were applied.
pub fn run(store: &Store, db_path: &Path, lock_timeout: Duration) -> Result<usize, MigrationError> {
    let _lock = acquire_lock(db_path, lock_timeout)?;
    apply_pending(store)
}

/// Apply pending migrations without a file lock. For in-memory stores and
/// tests; real startup goes through [`run`].
pub fn apply_pending(store: &Store) -> Result<usize, MigrationError> {
    let mut applied = 0;
    for migration in MIGRATIONS {
        let done = store.with_conn(|conn| is_applied(conn, migration.version))?;
        if done {
            continue;
        }
        if migration.destructive {
            return Err(MigrationError::Destructive {
                version: migration.version,
                name: migration.name,
            });
        }
        store.transaction(|conn| -> Result<(), StoreError> {
            conn.execute_batch(migration.sql)?;
            conn.execute(
                "INSERT INTO schema_migrations (version, name, applied_at_ms)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![migration.version, migration.name, now_ms()],
            )?;
            Ok(())
        })?;
        info!(version = migration.version, name = migration.name, "applied migration");
        applied += 1;
    }
    Ok(applied)
}

fn is_applied(conn: &Connection, version: i64) -> Result<bool, StoreError> {
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations')",
        [],
        |row| row.get(0),
    )?;
    if !table_exists {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at_ms INTEGER NOT NULL
            )",
        )?;
        return Ok(false);
    }
    let applied: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM schema_migrations WHERE version = ?1)",
        [version],
        |row| row.get(0),
    )?;
    Ok(applied)
}

fn acquire_lock(db_path: &Path, timeout: Duration) -> Result<File, MigrationError> {
    let lock_path = db_path.with_extension("migrate.lock");
    let file = File::create(&lock_path)?;
    let deadline = Instant::now() + timeout;
    let mut backoff = BACKOFF_INITIAL;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(_) if Instant::now() + backoff <= deadline => {
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
            Err(_) => return Err(MigrationError::LockTimeout(timeout)),
        }
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// The full schema, newest last. Upgrades are additive.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "base_schema",
        destructive: false,
        sql: r#"
CREATE TABLE workflows (
    name TEXT PRIMARY KEY,
    description TEXT NOT NULL DEFAULT '',
    phases TEXT NOT NULL,
    complexity TEXT,
    triggers TEXT,
    hash TEXT NOT NULL,
    updated_at_ms INTEGER NOT NULL
);

CREATE TABLE agents (
    name TEXT PRIMARY KEY,
    description TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL,
    updated_at_ms INTEGER NOT NULL
);

CREATE TABLE project_associations (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    path TEXT NOT NULL UNIQUE,
    is_git_repo INTEGER NOT NULL DEFAULT 0,
    metadata TEXT,
    discovered_at_ms INTEGER NOT NULL,
    last_used_at_ms INTEGER NOT NULL
);

CREATE TABLE executions (
    execution_id TEXT PRIMARY KEY,
    workflow_name TEXT NOT NULL,
    state TEXT NOT NULL,
    current_step_name TEXT,
    project_id INTEGER REFERENCES project_associations(id),
    metadata TEXT,
    timeout_ms INTEGER,
    started_at_ms INTEGER,
    updated_at_ms INTEGER NOT NULL,
    completed_at_ms INTEGER,
    duration_ms INTEGER
);
CREATE INDEX idx_executions_state ON executions(state);

CREATE TABLE steps (
    step_id TEXT PRIMARY KEY,
    execution_id TEXT NOT NULL REFERENCES executions(execution_id) ON DELETE CASCADE,
    step_name TEXT NOT NULL,
    agent_name TEXT NOT NULL,
    status TEXT NOT NULL,
    depends_on TEXT NOT NULL DEFAULT '[]',
    token TEXT,
    output TEXT,
    error TEXT,
    started_at_ms INTEGER,
    completed_at_ms INTEGER,
    duration_ms INTEGER,
    UNIQUE (execution_id, step_name)
);

CREATE TABLE artifacts (
    artifact_id TEXT PRIMARY KEY,
    execution_id TEXT NOT NULL REFERENCES executions(execution_id) ON DELETE CASCADE,
    step_name TEXT NOT NULL,
    artifact_type TEXT NOT NULL,
    name TEXT NOT NULL,
    content TEXT NOT NULL,
    content_type TEXT,
    size_bytes INTEGER NOT NULL,
    metadata TEXT,
    created_at_ms INTEGER NOT NULL
);
CREATE INDEX idx_artifacts_execution ON artifacts(execution_id);

-- artifacts are write-once
CREATE TRIGGER artifacts_immutable
BEFORE UPDATE ON artifacts
BEGIN
    SELECT RAISE(ABORT, 'artifacts are immutable');
END;

CREATE TABLE findings (
    finding_id TEXT PRIMARY KEY,
    execution_id TEXT NOT NULL REFERENCES executions(execution_id) ON DELETE CASCADE,
    step_id TEXT,
    severity TEXT NOT NULL,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    is_global INTEGER NOT NULL DEFAULT 0,
    project_id INTEGER,
    location TEXT,
    metadata TEXT,
    created_at_ms INTEGER NOT NULL
);
CREATE INDEX idx_findings_execution ON findings(execution_id);
CREATE INDEX idx_findings_project ON findings(project_id);

CREATE VIRTUAL TABLE findings_fts USING fts5(
    title, description, tags, category,
    content='findings', content_rowid='rowid'
);

CREATE TRIGGER findings_fts_insert AFTER INSERT ON findings BEGIN
    INSERT INTO findings_fts (rowid, title, description, tags, category)
    VALUES (new.rowid, new.title, new.description, new.tags, new.category);
END;

CREATE TRIGGER findings_fts_delete AFTER DELETE ON findings BEGIN
    INSERT INTO findings_fts (findings_fts, rowid, title, description, tags, category)
    VALUES ('delete', old.rowid, old.title, old.description, old.tags, old.category);
END;

CREATE TRIGGER findings_fts_update AFTER UPDATE ON findings BEGIN
    INSERT INTO findings_fts (findings_fts, rowid, title, description, tags, category)
    VALUES ('delete', old.rowid, old.title, old.description, old.tags, old.category);
    INSERT INTO findings_fts (rowid, title, description, tags, category)
    VALUES (new.rowid, new.title, new.description, new.tags, new.category);
END;

CREATE TABLE execution_logs (
    id INTEGER PRIMARY KEY,
    execution_id TEXT NOT NULL REFERENCES executions(execution_id) ON DELETE CASCADE,
    layer TEXT NOT NULL,
    layer_id TEXT NOT NULL,
    log_level TEXT NOT NULL,
    message TEXT NOT NULL,
    context TEXT,
    contract_input TEXT,
    contract_output TEXT,
    timestamp_ms INTEGER NOT NULL,
    UNIQUE (execution_id, layer, layer_id)
);

CREATE TABLE telemetry_events (
    id INTEGER PRIMARY KEY,
    event_type TEXT NOT NULL,
    execution_id TEXT,
    step_name TEXT,
    agent_name TEXT,
    metadata TEXT,
    created_at_ms INTEGER NOT NULL
);
CREATE INDEX idx_telemetry_execution ON telemetry_events(execution_id);
"#,
    },
    Migration {
        version: 2,
        name: "telemetry_created_at_index",
        destructive: false,
        sql: "CREATE INDEX idx_telemetry_created_at ON telemetry_events(created_at_ms);",
    },
];

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
