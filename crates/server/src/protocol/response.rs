// SPDX-License-Identifier: MIT

use cue_core::{ArtifactKind, ExecutionId, ExecutionState, Severity, Step, StepStatus};
use cue_engine::{EngineError, StepCue};
use serde::{Deserialize, Serialize};

/// Response to one request. `result` shapes are per-operation; error frames
/// carry the stable kind from [`EngineError::kind`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { result: serde_json::Value },
    Error { kind: String, message: String },
}

impl Response {
    pub fn ok(result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Response::Ok { result },
            Err(e) => Response::Error {
                kind: "Internal".to_string(),
                message: format!("response encoding failed: {e}"),
            },
        }
    }

    pub fn error(e: &EngineError) -> Self {
        Response::Error { kind: e.kind().to_string(), message: e.to_string() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Response::Error { kind: "InvalidArguments".to_string(), message: message.into() }
    }
}

/// A step handed to the caller: persona plus the token that advances it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CueBody {
    pub execution_id: ExecutionId,
    pub workflow_state: ExecutionState,
    pub step_name: String,
    pub agent_name: String,
    pub agent_content: String,
    pub token: String,
}

impl From<StepCue> for CueBody {
    fn from(cue: StepCue) -> Self {
        Self {
            execution_id: cue.execution_id,
            workflow_state: ExecutionState::Running,
            step_name: cue.step_name,
            agent_name: cue.agent_name,
            agent_content: cue.agent_content,
            token: cue.token,
        }
    }
}

/// Terminal completion of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedBody {
    pub execution_id: ExecutionId,
    pub workflow_state: ExecutionState,
}

/// One row of step history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSummary {
    pub step_name: String,
    pub agent_name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl From<Step> for StepSummary {
    fn from(step: Step) -> Self {
        Self {
            step_name: step.step_name,
            agent_name: step.agent_name,
            status: step.status,
            summary: step.output.map(|o| o.summary),
            started_at_ms: step.started_at_ms,
            completed_at_ms: step.completed_at_ms,
            duration_ms: step.duration_ms,
        }
    }
}

/// Stored-artifact acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactBody {
    pub artifact_id: String,
    pub artifact_type: ArtifactKind,
    pub name: String,
    pub size_bytes: u64,
}

/// Stored-finding acknowledgement, with the execution state after
/// escalation evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FindingBody {
    pub finding_id: String,
    pub severity: Severity,
    pub execution_state: ExecutionState,
    pub escalated: bool,
}

/// Project plus its finding histogram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectContextBody {
    pub project: cue_core::ProjectAssociation,
    pub finding_counts: Vec<(Severity, u32)>,
}

/// Server identity and health.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerStatusBody {
    pub version: String,
    pub uptime_ms: u64,
    pub store_healthy: bool,
    pub incomplete_executions: u32,
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
