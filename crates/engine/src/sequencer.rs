// SPDX-License-Identifier: MIT

//! Step sequencing: start a workflow, advance it one step at a time.
//!
//! The whole run state moves inside single store transactions. Two
//! concurrent advances against one execution serialize at the store; the
//! loser finds the current step has moved on and gets `TokenStepMismatch`.

use std::collections::HashSet;

use cue_core::{
    Clock, Execution, ExecutionId, ExecutionState, PhaseDef, Step, StepOutput, StepStatus,
    TelemetryEvent, WorkflowDef,
};
use cue_store::{executions, projects, steps, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::EngineError;
use crate::machine::activate_step;
use crate::registry;
use crate::Engine;

/// Inputs to [`Engine::start_workflow`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    pub workflow_name: String,
    /// Caller-supplied run id; generated when absent.
    pub execution_id: Option<String>,
    /// Project to scope findings to; registered on first use.
    pub project_path: Option<String>,
    pub timeout_ms: Option<u64>,
    pub metadata: Option<serde_json::Value>,
}

impl StartRequest {
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self { workflow_name: workflow_name.into(), ..Self::default() }
    }
}

/// What the caller needs to act on one step: the persona and the token that
/// advances past it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCue {
    pub execution_id: ExecutionId,
    pub step_name: String,
    pub agent_name: String,
    pub agent_content: String,
    pub token: String,
}

/// Result of an advance: the next cue, or the end of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdvanceOutcome {
    Next(StepCue),
    Completed { execution_id: ExecutionId },
}

// Internal advance result: the agent-missing case must commit the failure
// before the operation reports it as an error.
enum AdvanceTx {
    Next(StepCue),
    Completed(ExecutionId),
    AgentMissing(String),
}

impl<C: Clock> Engine<C> {
    /// Start a workflow: create the execution, activate its starting phase,
    /// and hand back the first cue.
    ///
    /// The starting phase's persona is checked before any row is written, so
    /// a missing agent leaves no trace.
    pub fn start_workflow(&self, request: StartRequest) -> Result<StepCue, EngineError> {
        let now = self.now_ms();
        if matches!(&request.execution_id, Some(id) if id.is_empty()) {
            return Err(EngineError::InvalidArguments("execution_id is empty".to_string()));
        }
        let execution_id = request
            .execution_id
            .clone()
            .map(ExecutionId::from_string)
            .unwrap_or_default();

        let cue = self.store.transaction(|conn| {
            let workflow = registry::load_workflow(conn, &request.workflow_name)?;
            let phase = workflow
                .starting_phase()
                .ok_or_else(|| EngineError::NoStartingPhase(workflow.name.clone()))?;
            let agent = registry::load_agent(conn, &phase.agent_name)?;

            if executions::exists(conn, execution_id.as_str())? {
                return Err(EngineError::DuplicateExecutionId(execution_id.to_string()));
            }

            let mut execution = Execution::new(execution_id.clone(), &workflow.name, now);
            execution.timeout_ms = request.timeout_ms;
            execution.metadata = request.metadata.clone();
            execution.project_id = match &request.project_path {
                Some(path) => Some(resolve_project(conn, path, now)?),
                None => None,
            };
            executions::insert(conn, &execution)?;

            let mut step = Step::new(
                execution_id.clone(),
                &phase.phase_name,
                &phase.agent_name,
                phase.depends_on.clone(),
            );
            steps::insert(conn, &step)?;
            let token = activate_step(conn, &self.tokens, &mut step, now)?;

            execution.transition(ExecutionState::Running, now)?;
            execution.current_step_name = Some(phase.phase_name.clone());
            executions::update(conn, &execution)?;

            self.record_telemetry_on(
                conn,
                TelemetryEvent::new("workflow_started", now)
                    .for_execution(execution_id.clone())
                    .with_step(&phase.phase_name)
                    .with_metadata(json!({"workflow": workflow.name})),
            );

            Ok(StepCue {
                execution_id: execution_id.clone(),
                step_name: phase.phase_name.clone(),
                agent_name: agent.name,
                agent_content: agent.content,
                token,
            })
        })?;

        info!(execution_id = %cue.execution_id, workflow = %request.workflow_name,
              step = %cue.step_name, "workflow started");
        Ok(cue)
    }

    /// Record the current step's output and move to the next phase, or
    /// declare the run complete.
    pub fn advance_step(
        &self,
        token: &str,
        output: StepOutput,
    ) -> Result<AdvanceOutcome, EngineError> {
        let now = self.now_ms();
        let payload = match self.tokens.validate(token, now) {
            Ok(payload) => payload,
            Err(e) => {
                if matches!(e, EngineError::TokenExpired) {
                    self.record_telemetry(
                        TelemetryEvent::new("token_expired", now)
                            .with_metadata(json!({"operation": "advance_step"})),
                    );
                }
                return Err(e);
            }
        };

        let result = self.store.transaction(|conn| {
            self.advance_in_tx(conn, token, &payload, output, now)
        });

        match result {
            Ok(AdvanceTx::Next(cue)) => {
                info!(execution_id = %cue.execution_id, step = %cue.step_name, "step advanced");
                Ok(AdvanceOutcome::Next(cue))
            }
            Ok(AdvanceTx::Completed(execution_id)) => {
                info!(execution_id = %execution_id, "workflow completed");
                Ok(AdvanceOutcome::Completed { execution_id })
            }
            Ok(AdvanceTx::AgentMissing(agent)) => {
                self.record_telemetry(
                    TelemetryEvent::new("workflow_failed", now)
                        .for_execution(ExecutionId::from_string(&payload.execution_id))
                        .with_metadata(json!({"missing_agent": agent})),
                );
                Err(EngineError::AgentNotFound(agent))
            }
            Err(e) => {
                if matches!(e, EngineError::TokenStepMismatch { .. }) {
                    self.record_telemetry(
                        TelemetryEvent::new("token_step_mismatch", now)
                            .for_execution(ExecutionId::from_string(&payload.execution_id))
                            .with_step(&payload.step_name),
                    );
                }
                Err(e)
            }
        }
    }

    fn advance_in_tx(
        &self,
        conn: &Connection,
        token: &str,
        payload: &crate::token::TokenPayload,
        output: StepOutput,
        now: u64,
    ) -> Result<AdvanceTx, EngineError> {
        let mut execution = executions::get(conn, &payload.execution_id)?
            .ok_or_else(|| EngineError::ExecutionNotFound(payload.execution_id.clone()))?;

        if execution.state.is_terminal() {
            return Err(EngineError::AlreadyTerminal(execution.state));
        }
        if execution.state != ExecutionState::Running {
            return Err(EngineError::NotRunnable(execution.state));
        }
        if execution.current_step_name.as_deref() != Some(payload.step_name.as_str()) {
            return Err(EngineError::TokenStepMismatch {
                token_step: payload.step_name.clone(),
                current_step: execution.current_step_name.clone(),
            });
        }

        let mut step = steps::get(conn, &payload.execution_id, &payload.step_name)?
            .ok_or_else(|| EngineError::NotFound(format!("step '{}'", payload.step_name)))?;
        if step.status != StepStatus::Running {
            return Err(EngineError::StepNotRunning {
                step_name: step.step_name.clone(),
                status: step.status,
            });
        }
        // a resumed step carries a fresh token; a stale one no longer matches
        if step.token.as_deref() != Some(token) {
            return Err(EngineError::TokenStepMismatch {
                token_step: payload.step_name.clone(),
                current_step: execution.current_step_name.clone(),
            });
        }

        step.output = Some(output);
        step.transition(StepStatus::Completed, now)?;
        steps::update(conn, &step)?;
        self.record_telemetry_on(
            conn,
            TelemetryEvent::new("step_completed", now)
                .for_execution(execution.execution_id.clone())
                .with_step(&step.step_name),
        );

        let workflow = registry::load_workflow(conn, &execution.workflow_name)?;
        match next_phase(conn, &workflow, execution.execution_id.as_str())? {
            None => {
                execution.transition(ExecutionState::Completed, now)?;
                executions::update(conn, &execution)?;
                self.record_telemetry_on(
                    conn,
                    TelemetryEvent::new("workflow_completed", now)
                        .for_execution(execution.execution_id.clone()),
                );
                Ok(AdvanceTx::Completed(execution.execution_id))
            }
            Some(phase) => match registry::load_agent(conn, &phase.agent_name) {
                Err(EngineError::AgentNotFound(agent)) => {
                    // a run that cannot continue must not stall silently
                    execution.transition(ExecutionState::Failed, now)?;
                    executions::update(conn, &execution)?;
                    Ok(AdvanceTx::AgentMissing(agent))
                }
                Err(e) => Err(e),
                Ok(agent) => {
                    let mut next = Step::new(
                        execution.execution_id.clone(),
                        &phase.phase_name,
                        &phase.agent_name,
                        phase.depends_on.clone(),
                    );
                    steps::insert(conn, &next)?;
                    let next_token = activate_step(conn, &self.tokens, &mut next, now)?;

                    execution.current_step_name = Some(phase.phase_name.clone());
                    execution.updated_at_ms = now;
                    executions::update(conn, &execution)?;

                    Ok(AdvanceTx::Next(StepCue {
                        execution_id: execution.execution_id.clone(),
                        step_name: phase.phase_name.clone(),
                        agent_name: agent.name,
                        agent_content: agent.content,
                        token: next_token,
                    }))
                }
            },
        }
    }
}

/// Tie-breaking: among phases not yet instantiated whose dependencies are
/// all completed, take the earliest in declared order. `None` means the
/// workflow is complete.
fn next_phase<'a>(
    conn: &Connection,
    workflow: &'a WorkflowDef,
    execution_id: &str,
) -> Result<Option<&'a PhaseDef>, EngineError> {
    let created: HashSet<String> = steps::list_for_execution(conn, execution_id)?
        .into_iter()
        .map(|s| s.step_name)
        .collect();
    let completed = steps::completed_names(conn, execution_id)?;
    Ok(workflow.phases.iter().find(|phase| {
        !created.contains(&phase.phase_name)
            && phase.depends_on.iter().all(|dep| completed.contains(dep.as_str()))
    }))
}

fn resolve_project(conn: &Connection, path: &str, now_ms: u64) -> Result<i64, EngineError> {
    let name = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path);
    let project = projects::upsert(conn, name, path, false, None, now_ms)?;
    Ok(project.id)
}

#[cfg(test)]
#[path = "sequencer_tests.rs"]
mod tests;
