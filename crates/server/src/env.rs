// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the server.
//!
//! Configuration is read once at startup; nothing else in the workspace
//! touches `std::env`.

use std::path::PathBuf;
use std::time::Duration;

use cue_engine::EscalationPolicy;

pub const DEFAULT_DB_PATH: &str = "./shared/database/app.db";

/// Server configuration, environment-overridable.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store file path (`CUE_DB_PATH`).
    pub db_path: PathBuf,
    /// Migration lock timeout (`CUE_MIGRATION_TIMEOUT_MS`, default 10 min).
    pub migration_timeout: Duration,
    /// Timeout-sweep cadence (`CUE_SWEEP_INTERVAL_MS`, default 5 s).
    pub sweep_interval: Duration,
    /// Store page-cache size in KiB (`CUE_CACHE_KIB`, default 64 MiB).
    pub cache_kib: u32,
    /// Escalation thresholds (`CUE_ESCALATE_CRITICAL`, `CUE_ESCALATE_HIGH`,
    /// `CUE_ESCALATE_BLOCKERS`).
    pub escalation: EscalationPolicy,
    /// Optional log file directory (`CUE_LOG_DIR`); stderr-only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            migration_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(5),
            cache_kib: 65_536,
            escalation: EscalationPolicy::default(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Read the configuration from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let escalation_defaults = EscalationPolicy::default();
        Self {
            db_path: std::env::var("CUE_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            migration_timeout: env_ms("CUE_MIGRATION_TIMEOUT_MS")
                .unwrap_or(defaults.migration_timeout),
            sweep_interval: env_ms("CUE_SWEEP_INTERVAL_MS").unwrap_or(defaults.sweep_interval),
            cache_kib: env_parse("CUE_CACHE_KIB").unwrap_or(defaults.cache_kib),
            escalation: EscalationPolicy {
                max_critical: env_parse("CUE_ESCALATE_CRITICAL")
                    .unwrap_or(escalation_defaults.max_critical),
                max_high: env_parse("CUE_ESCALATE_HIGH").unwrap_or(escalation_defaults.max_high),
                max_blockers: env_parse("CUE_ESCALATE_BLOCKERS")
                    .unwrap_or(escalation_defaults.max_blockers),
            },
            log_dir: std::env::var("CUE_LOG_DIR").ok().map(PathBuf::from),
        }
    }
}

/// Log filter directive (`CUE_LOG`, default `info`).
pub fn log_filter() -> String {
    std::env::var("CUE_LOG").unwrap_or_else(|_| "info".to_string())
}

fn env_ms(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
