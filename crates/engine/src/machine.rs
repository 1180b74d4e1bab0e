// SPDX-License-Identifier: MIT

//! Transactional application of the core state machines.
//!
//! The core types validate transitions and keep their own bookkeeping; this
//! module makes the execution row and its steps move together inside one
//! store transaction, and closes out the live step when an execution is
//! forced into a terminal state from outside the advance path.

use cue_core::{
    Clock, Execution, ExecutionState, Step, StepStatus, TelemetryEvent,
};
use cue_store::{executions, steps, Connection};
use serde_json::json;

use crate::error::EngineError;
use crate::token::TokenService;
use crate::Engine;

impl<C: Clock> Engine<C> {
    /// Transition an execution to `target`, enforcing the state-machine
    /// table. On a terminal target, a still-running step is failed alongside
    /// so no step outlives its execution with a live token.
    pub fn transition_execution(
        &self,
        execution_id: &str,
        target: ExecutionState,
        reason: Option<&str>,
    ) -> Result<Execution, EngineError> {
        let now = self.now_ms();
        self.store.transaction(|conn| {
            let mut execution = executions::get(conn, execution_id)?
                .ok_or_else(|| EngineError::ExecutionNotFound(execution_id.to_string()))?;
            let from = execution.state;
            let live_step = execution.current_step_name.clone();

            // `completed` is the sequencer's verdict: it only holds once every
            // phase has been worked through. A direct transition while a step
            // is still running is rejected, not repaired.
            if target == ExecutionState::Completed {
                if let Some(name) = live_step.as_deref() {
                    if let Some(step) = steps::get(conn, execution_id, name)? {
                        if step.status == StepStatus::Running {
                            return Err(EngineError::InvalidTransition {
                                from: from.to_string(),
                                to: target.to_string(),
                            });
                        }
                    }
                }
            }

            execution.transition(target, now)?;
            executions::update(conn, &execution)?;

            if target.is_terminal() {
                close_live_step(conn, execution_id, live_step.as_deref(), reason, target, now)?;
            }

            self.record_telemetry_on(
                conn,
                TelemetryEvent::new("execution_state_changed", now)
                    .for_execution(execution.execution_id.clone())
                    .with_metadata(json!({
                        "from": from.to_string(),
                        "to": target.to_string(),
                        "reason": reason,
                    })),
            );
            Ok(execution)
        })
    }

    /// Transition a step to `target`. Entering `running` requires every
    /// dependency to be completed and mints the step's token.
    ///
    /// The execution row moves in the same transaction: failing the current
    /// step fails the run, and any other terminal exit of the current step
    /// clears `current_step_name` so the execution never points at a dead
    /// step.
    pub fn transition_step(
        &self,
        execution_id: &str,
        step_name: &str,
        target: StepStatus,
        output: Option<cue_core::StepOutput>,
        error: Option<String>,
    ) -> Result<Step, EngineError> {
        let now = self.now_ms();
        self.store.transaction(|conn| {
            let mut step = steps::get(conn, execution_id, step_name)?
                .ok_or_else(|| EngineError::NotFound(format!("step '{step_name}'")))?;
            if let Some(output) = output {
                step.output = Some(output);
            }
            if let Some(error) = error {
                step.error = Some(error);
            }
            if target == StepStatus::Running {
                activate_step(conn, &self.tokens, &mut step, now)?;
                return Ok(step);
            }

            step.transition(target, now)?;
            steps::update(conn, &step)?;

            if let Some(mut execution) = executions::get(conn, execution_id)? {
                let is_current = execution.current_step_name.as_deref() == Some(step_name);
                if is_current && !execution.state.is_terminal() {
                    if target == StepStatus::Failed {
                        let reason = step.error.clone().unwrap_or_else(|| "step failed".to_string());
                        let from = execution.state;
                        execution.transition(ExecutionState::Failed, now)?;
                        executions::update(conn, &execution)?;
                        self.record_telemetry_on(
                            conn,
                            TelemetryEvent::new("execution_state_changed", now)
                                .for_execution(execution.execution_id.clone())
                                .with_metadata(json!({
                                    "from": from.to_string(),
                                    "to": "failed",
                                    "reason": reason,
                                })),
                        );
                    } else {
                        execution.current_step_name = None;
                        execution.updated_at_ms = now;
                        executions::update(conn, &execution)?;
                    }
                }
            }
            Ok(step)
        })
    }
}

/// Check dependencies, move a step into `running`, mint its token, persist.
pub(crate) fn activate_step(
    conn: &Connection,
    tokens: &TokenService,
    step: &mut Step,
    now_ms: u64,
) -> Result<String, EngineError> {
    let completed = steps::completed_names(conn, step.execution_id.as_str())?;
    let missing: Vec<String> =
        step.depends_on.iter().filter(|d| !completed.contains(d.as_str())).cloned().collect();
    if !missing.is_empty() {
        return Err(EngineError::DependenciesNotMet {
            step_name: step.step_name.clone(),
            missing,
        });
    }
    step.transition(StepStatus::Running, now_ms)?;
    let token = tokens.issue(step.execution_id.as_str(), &step.step_name, now_ms);
    step.token = Some(token.clone());
    steps::update(conn, step)?;
    Ok(token)
}

// A terminal execution must not leave a running step (and its token) behind.
fn close_live_step(
    conn: &Connection,
    execution_id: &str,
    step_name: Option<&str>,
    reason: Option<&str>,
    target: ExecutionState,
    now_ms: u64,
) -> Result<(), EngineError> {
    let Some(step_name) = step_name else { return Ok(()) };
    let Some(mut step) = steps::get(conn, execution_id, step_name)? else { return Ok(()) };
    if step.status != StepStatus::Running {
        return Ok(());
    }
    step.error = Some(reason.map(str::to_string).unwrap_or_else(|| format!("execution {target}")));
    step.transition(StepStatus::Failed, now_ms)?;
    steps::update(conn, &step)?;
    Ok(())
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
