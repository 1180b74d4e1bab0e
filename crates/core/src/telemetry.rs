// SPDX-License-Identifier: MIT

//! Append-only telemetry events. Best-effort: a telemetry write failure
//! never fails the operation that produced it.

use crate::id::ExecutionId;
use serde::{Deserialize, Serialize};

pub const TELEMETRY_LIMIT_DEFAULT: u32 = 100;
pub const TELEMETRY_LIMIT_MAX: u32 = 1000;

/// One telemetry row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event_type: String,
    pub execution_id: Option<ExecutionId>,
    pub step_name: Option<String>,
    pub agent_name: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at_ms: u64,
}

impl TelemetryEvent {
    pub fn new(event_type: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            event_type: event_type.into(),
            execution_id: None,
            step_name: None,
            agent_name: None,
            metadata: None,
            created_at_ms,
        }
    }

    pub fn for_execution(mut self, execution_id: ExecutionId) -> Self {
        self.execution_id = Some(execution_id);
        self
    }

    pub fn with_step(mut self, step_name: impl Into<String>) -> Self {
        self.step_name = Some(step_name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Clamp a caller-supplied query limit into `1..=1000`. Absent or
/// non-positive input lands on the default of 100 for `None`, 1 for an
/// explicit non-positive value.
pub fn clamp_limit(limit: Option<i64>) -> u32 {
    match limit {
        None => TELEMETRY_LIMIT_DEFAULT,
        Some(n) if n < 1 => 1,
        Some(n) if n > TELEMETRY_LIMIT_MAX as i64 => TELEMETRY_LIMIT_MAX,
        Some(n) => n as u32,
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
