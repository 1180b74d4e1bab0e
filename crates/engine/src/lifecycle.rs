// SPDX-License-Identifier: MIT

//! Execution lifecycle: the timeout sweep and resumption.
//!
//! Timeouts are enforced by a periodic sweep over running executions, not by
//! per-run timers; worst-case late detection equals the sweep cadence. Any
//! server process can resume any timed-out run because all state is in the
//! store.

use cue_core::{Clock, Execution, ExecutionState, Step, StepStatus, TelemetryEvent};
use cue_store::{executions, steps};
use serde_json::json;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::registry;
use crate::Engine;

impl<C: Clock> Engine<C> {
    /// Force every running execution whose budget is exhausted at the
    /// current clock into `timeout`. Per-execution failures are logged and
    /// skipped, so one bad row cannot stall the sweep. Idempotent: a second
    /// pass with no newly-eligible rows returns empty.
    pub fn check_timeouts(&self) -> Result<Vec<Execution>, EngineError> {
        let now = self.now_ms();
        let candidates = self.store.with_conn(|conn| {
            executions::list_running_with_timeout(conn).map_err(EngineError::from)
        })?;

        let mut transitioned = Vec::new();
        for candidate in candidates {
            if !candidate.timed_out(now) {
                continue;
            }
            match self.transition_execution(
                candidate.execution_id.as_str(),
                ExecutionState::Timeout,
                Some("exceeded timeout"),
            ) {
                Ok(execution) => {
                    info!(execution_id = %execution.execution_id, "execution timed out");
                    transitioned.push(execution);
                }
                Err(e) => {
                    warn!(execution_id = %candidate.execution_id, error = %e,
                          "timeout sweep skipped execution");
                }
            }
        }
        Ok(transitioned)
    }

    /// Bring a timed-out or escalated execution back to `running` and mint a
    /// fresh token for its current step. The old token is never reinstated.
    pub fn resume_execution(&self, execution_id: &str) -> Result<crate::StepCue, EngineError> {
        let now = self.now_ms();
        let cue = self.store.transaction(|conn| {
            let mut execution = executions::get(conn, execution_id)?
                .ok_or_else(|| EngineError::ExecutionNotFound(execution_id.to_string()))?;
            if !execution.state.is_resumable() {
                return Err(EngineError::NotResumable(execution.state));
            }

            let step_name = execution.current_step_name.clone().ok_or_else(|| {
                EngineError::NotFound(format!("current step of '{execution_id}'"))
            })?;
            let mut step = steps::get(conn, execution_id, &step_name)?
                .ok_or_else(|| EngineError::NotFound(format!("step '{step_name}'")))?;
            if step.status != StepStatus::Running {
                return Err(EngineError::StepNotRunning {
                    step_name: step.step_name.clone(),
                    status: step.status,
                });
            }
            let agent = registry::load_agent(conn, &step.agent_name)?;

            execution.transition(ExecutionState::Running, now)?;
            executions::update(conn, &execution)?;

            let token = self.tokens.issue(execution_id, &step_name, now);
            step.token = Some(token.clone());
            steps::update(conn, &step)?;

            self.record_telemetry_on(
                conn,
                TelemetryEvent::new("execution_resumed", now)
                    .for_execution(execution.execution_id.clone())
                    .with_step(&step_name),
            );

            Ok(crate::StepCue {
                execution_id: execution.execution_id,
                step_name,
                agent_name: agent.name,
                agent_content: agent.content,
                token,
            })
        })?;

        info!(execution_id = %cue.execution_id, step = %cue.step_name, "execution resumed");
        Ok(cue)
    }

    /// Pending steps whose dependencies are all completed. The sequential
    /// path never leaves steps pending, but a parallel scheduler reads this
    /// directly.
    pub fn ready_steps(&self, execution_id: &str) -> Result<Vec<Step>, EngineError> {
        self.store.with_conn(|conn| {
            if !executions::exists(conn, execution_id)? {
                return Err(EngineError::ExecutionNotFound(execution_id.to_string()));
            }
            let completed = steps::completed_names(conn, execution_id)?;
            let ready = steps::list_for_execution(conn, execution_id)?
                .into_iter()
                .filter(|step| {
                    step.status == StepStatus::Pending
                        && step.depends_on.iter().all(|d| completed.contains(d.as_str()))
                })
                .collect();
            Ok(ready)
        })
    }

    /// Register an execution row without starting it. The sequencer's start
    /// path does this inline; this entry point exists for callers that stage
    /// runs ahead of time.
    pub fn create_execution(
        &self,
        workflow_name: &str,
        execution_id: Option<String>,
        timeout_ms: Option<u64>,
        metadata: Option<serde_json::Value>,
    ) -> Result<Execution, EngineError> {
        let now = self.now_ms();
        if matches!(&execution_id, Some(id) if id.is_empty()) {
            return Err(EngineError::InvalidArguments("execution_id is empty".to_string()));
        }
        let execution_id =
            execution_id.map(cue_core::ExecutionId::from_string).unwrap_or_default();
        self.store.transaction(|conn| {
            registry::load_workflow(conn, workflow_name)?;
            if executions::exists(conn, execution_id.as_str())? {
                return Err(EngineError::DuplicateExecutionId(execution_id.to_string()));
            }
            let mut execution = Execution::new(execution_id.clone(), workflow_name, now);
            execution.timeout_ms = timeout_ms;
            execution.metadata = metadata;
            executions::insert(conn, &execution)?;
            self.record_telemetry_on(
                conn,
                TelemetryEvent::new("execution_created", now)
                    .for_execution(execution_id.clone())
                    .with_metadata(json!({"workflow": workflow_name})),
            );
            Ok(execution)
        })
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
