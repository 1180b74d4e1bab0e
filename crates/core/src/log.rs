// SPDX-License-Identifier: MIT

//! Structured execution log entries.
//!
//! Entries are keyed by `(execution_id, layer, layer_id)`; the store makes
//! inserts idempotent on that key. `layer_id` is opaque -- callers pick
//! whatever makes a retried write land on the same row.

use crate::id::ExecutionId;
use serde::{Deserialize, Serialize};

/// Which layer of the orchestration produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLayer {
    Orchestrator,
    Workflow,
    Step,
    AgentTask,
}

crate::simple_display! {
    LogLayer {
        Orchestrator => "orchestrator",
        Workflow => "workflow",
        Step => "step",
        AgentTask => "agent_task",
    }
}

crate::enum_parse! {
    LogLayer {
        "orchestrator" => Orchestrator,
        "workflow" => Workflow,
        "step" => Step,
        "agent_task" => AgentTask,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

crate::enum_parse! {
    LogLevel {
        "debug" => Debug,
        "info" => Info,
        "warn" => Warn,
        "error" => Error,
    }
}

/// One structured log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub execution_id: ExecutionId,
    pub layer: LogLayer,
    /// Idempotency key within (execution, layer).
    pub layer_id: String,
    pub level: LogLevel,
    pub message: String,
    pub context: Option<serde_json::Value>,
    pub contract_input: Option<serde_json::Value>,
    pub contract_output: Option<serde_json::Value>,
    pub timestamp_ms: u64,
}

impl LogEntry {
    pub fn new(
        execution_id: ExecutionId,
        layer: LogLayer,
        layer_id: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            execution_id,
            layer,
            layer_id: layer_id.into(),
            level,
            message: message.into(),
            context: None,
            contract_input: None,
            contract_output: None,
            timestamp_ms,
        }
    }
}

/// Filters for log queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub layer: Option<LogLayer>,
    pub level: Option<LogLevel>,
    pub limit: Option<u32>,
}
