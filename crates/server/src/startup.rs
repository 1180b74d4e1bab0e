// SPDX-License-Identifier: MIT

//! Server startup: open the store, run migrations under the file lock,
//! build the engine.

use cue_engine::Engine;
use cue_store::{migrations, Store, StoreError, StoreOptions};
use thiserror::Error;
use tracing::info;

use crate::env::Config;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not create state directory '{path}': {source}")]
    StateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Migration(#[from] migrations::MigrationError),
}

/// Open (and migrate) the store, returning a ready engine.
pub fn startup(config: &Config) -> Result<Engine, StartupError> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| StartupError::StateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }

    let store = Store::open(
        &config.db_path,
        StoreOptions { cache_kib: config.cache_kib, ..StoreOptions::default() },
    )?;
    let applied = migrations::run(&store, &config.db_path, config.migration_timeout)?;
    info!(
        db = %config.db_path.display(),
        migrations_applied = applied,
        "store ready"
    );

    Ok(Engine::new(store).with_escalation(config.escalation))
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
