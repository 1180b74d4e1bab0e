// SPDX-License-Identifier: MIT

use cue_core::{AgentPersona, ArtifactKind, LogLayer, LogLevel, Severity, StepOutput, WorkflowDef};
use serde::{Deserialize, Serialize};

/// Request from a transport adapter to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Start a workflow and receive the first cue
    StartWorkflow {
        workflow_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },

    /// Complete the current step and receive the next cue (or completion)
    AdvanceStep { token: String, output: StepOutput },

    /// The execution's current step with its live token
    GetCurrentStep { execution_id: String },

    /// Aggregate execution view
    GetExecutionStatus { execution_id: String },

    /// All steps of an execution in creation order
    GetStepHistory { execution_id: String },

    /// Artifact listings (content omitted)
    ListArtifacts {
        execution_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_name: Option<String>,
    },

    /// Full artifact including content
    GetArtifact { artifact_id: String },

    /// Write an immutable artifact. `content` is UTF-8 text, or base64 when
    /// `binary` is set.
    StoreArtifact {
        execution_id: String,
        step_name: String,
        artifact_type: ArtifactKind,
        name: String,
        content: String,
        #[serde(default)]
        binary: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },

    /// Record a finding (triggers escalation evaluation)
    StoreFinding {
        execution_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
        severity: Severity,
        category: String,
        title: String,
        description: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        is_global: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },

    /// Filtered finding query; `project_path` applies the scope rule
    QueryFindings {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_path: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        severities: Vec<Severity>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },

    /// Severity histogram under the same filters
    FindingCounts {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_id: Option<String>,
    },

    /// Idempotent structured log write
    LogEvent {
        execution_id: String,
        layer: LogLayer,
        layer_id: String,
        level: LogLevel,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contract_input: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contract_output: Option<serde_json::Value>,
    },

    /// Log entries for one execution
    QueryLogs {
        execution_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layer: Option<LogLayer>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<LogLevel>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },

    /// Telemetry events, newest first; limit clamped to 1..=1000
    ListTelemetry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<i64>,
    },

    /// Registry reads
    ListWorkflows,
    GetWorkflow { name: String },

    /// Registry writes (validated)
    RegisterWorkflow { workflow: WorkflowDef },
    RegisterAgent { agent: AgentPersona },

    /// Project discovery
    ListProjects,
    GetProjectContext { path: String },
    RegisterProject {
        name: String,
        path: String,
        #[serde(default)]
        is_git_repo: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },

    /// Non-terminal executions (the resumption surface)
    ListIncomplete,

    /// Bring a timed-out or escalated execution back to running
    ResumeExecution { execution_id: String },

    /// Force the timeout sweep immediately
    CheckTimeouts,

    /// Server identity, uptime, store health
    ServerStatus,

    /// Stop the server loop
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
