// SPDX-License-Identifier: MIT

//! Read-side operations: current step, status, history, artifacts,
//! telemetry, projects.

use cue_core::{clamp_limit, Clock, Execution, ExecutionId, ExecutionState, ProjectAssociation,
    Severity, Step, TelemetryEvent};
use cue_store::{artifacts, executions, findings, projects, steps, telemetry, ArtifactMeta,
    StepCounts};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::registry;
use crate::Engine;

/// What a caller sees when asking "where is this run?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurrentStep {
    /// A step holds the live token; everything needed to do the work.
    Active {
        execution_id: ExecutionId,
        workflow_state: ExecutionState,
        step_name: String,
        step_status: cue_core::StepStatus,
        agent_name: String,
        agent_content: String,
        token: String,
        progress: StepCounts,
        instructions: String,
    },
    /// No active step (terminal or not started).
    Inactive {
        execution_id: ExecutionId,
        workflow_state: ExecutionState,
        message: String,
    },
}

/// Aggregate view of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub execution_id: ExecutionId,
    pub workflow_name: String,
    pub state: ExecutionState,
    pub current_step_name: Option<String>,
    pub started_at_ms: Option<u64>,
    pub updated_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    pub duration_ms: Option<u64>,
    pub steps: StepCounts,
}

const INSTRUCTIONS: &str = "Assume the persona in agent_content, perform the step's work, \
then call advance_step with this token and a structured output summary.";

impl<C: Clock> Engine<C> {
    /// The current step of an execution, with the live token and persona.
    pub fn get_current_step(&self, execution_id: &str) -> Result<CurrentStep, EngineError> {
        self.store.with_conn(|conn| {
            let execution = executions::get(conn, execution_id)?
                .ok_or_else(|| EngineError::ExecutionNotFound(execution_id.to_string()))?;

            let Some(step_name) = execution.current_step_name.clone() else {
                return Ok(CurrentStep::Inactive {
                    execution_id: execution.execution_id,
                    workflow_state: execution.state,
                    message: inactive_message(execution.state),
                });
            };
            let step = steps::get(conn, execution_id, &step_name)?
                .ok_or_else(|| EngineError::NotFound(format!("step '{step_name}'")))?;
            let Some(token) = step.token.clone() else {
                return Ok(CurrentStep::Inactive {
                    execution_id: execution.execution_id,
                    workflow_state: execution.state,
                    message: format!("step '{step_name}' has no live token"),
                });
            };
            let agent = registry::load_agent(conn, &step.agent_name)?;
            let progress = executions::step_counts(conn, execution_id)?;

            Ok(CurrentStep::Active {
                execution_id: execution.execution_id,
                workflow_state: execution.state,
                step_name,
                step_status: step.status,
                agent_name: agent.name,
                agent_content: agent.content,
                token,
                progress,
                instructions: INSTRUCTIONS.to_string(),
            })
        })
    }

    pub fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus, EngineError> {
        self.store.with_conn(|conn| {
            let execution = executions::get(conn, execution_id)?
                .ok_or_else(|| EngineError::ExecutionNotFound(execution_id.to_string()))?;
            let steps = executions::step_counts(conn, execution_id)?;
            Ok(ExecutionStatus {
                execution_id: execution.execution_id,
                workflow_name: execution.workflow_name,
                state: execution.state,
                current_step_name: execution.current_step_name,
                started_at_ms: execution.started_at_ms,
                updated_at_ms: execution.updated_at_ms,
                completed_at_ms: execution.completed_at_ms,
                duration_ms: execution.duration_ms,
                steps,
            })
        })
    }

    /// All steps of an execution in creation order.
    pub fn get_step_history(&self, execution_id: &str) -> Result<Vec<Step>, EngineError> {
        self.store.with_conn(|conn| {
            if !executions::exists(conn, execution_id)? {
                return Err(EngineError::ExecutionNotFound(execution_id.to_string()));
            }
            steps::list_for_execution(conn, execution_id).map_err(EngineError::from)
        })
    }

    /// Non-terminal executions, oldest first. The resumption surface.
    pub fn list_incomplete_executions(&self) -> Result<Vec<Execution>, EngineError> {
        self.store
            .with_conn(|conn| executions::list_incomplete(conn).map_err(EngineError::from))
    }

    pub fn list_artifacts(
        &self,
        execution_id: &str,
        step_name: Option<&str>,
    ) -> Result<Vec<ArtifactMeta>, EngineError> {
        self.store.with_conn(|conn| {
            if !executions::exists(conn, execution_id)? {
                return Err(EngineError::ExecutionNotFound(execution_id.to_string()));
            }
            artifacts::list_meta(conn, execution_id, step_name).map_err(EngineError::from)
        })
    }

    pub fn get_artifact(&self, artifact_id: &str) -> Result<cue_core::Artifact, EngineError> {
        self.store.with_conn(|conn| {
            artifacts::get(conn, artifact_id)?
                .ok_or_else(|| EngineError::NotFound(format!("artifact '{artifact_id}'")))
        })
    }

    /// Telemetry, newest first. The limit is clamped to 1..=1000.
    pub fn list_telemetry(
        &self,
        execution_id: Option<&str>,
        event_type: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<TelemetryEvent>, EngineError> {
        let limit = clamp_limit(limit);
        self.store.with_conn(|conn| {
            telemetry::query(conn, execution_id, event_type, limit).map_err(EngineError::from)
        })
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectAssociation>, EngineError> {
        self.store.with_conn(|conn| projects::list(conn).map_err(EngineError::from))
    }

    /// A project plus its finding severity histogram (scoped rows and
    /// globals).
    pub fn project_context(
        &self,
        path: &str,
    ) -> Result<(ProjectAssociation, Vec<(Severity, u32)>), EngineError> {
        self.store.with_conn(|conn| {
            let project = projects::get_by_path(conn, path)?
                .ok_or_else(|| EngineError::NotFound(format!("project '{path}'")))?;
            let counts = findings::counts_by_severity(
                conn,
                &cue_core::FindingFilter::default(),
                Some(project.id),
            )?;
            Ok((project, counts))
        })
    }
}

fn inactive_message(state: ExecutionState) -> String {
    if state.is_terminal() {
        format!("execution is {state}; no further steps")
    } else {
        format!("execution is {state} with no active step")
    }
}

#[cfg(test)]
#[path = "queries_tests.rs"]
mod tests;
