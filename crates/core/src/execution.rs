// SPDX-License-Identifier: MIT

//! Execution identifier and state machine.
//!
//! An execution is one run of a workflow. State transitions are closed over
//! the table in [`ExecutionState::permitted_targets`]; everything else is
//! rejected with [`InvalidTransition`]. Terminal bookkeeping (completion
//! timestamp, duration, clearing the current step) happens here so every
//! caller gets it identically.

use crate::id::ExecutionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// State of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Created, no step started yet
    Idle,
    /// A step is in flight
    Running,
    /// Suspended by the caller
    Paused,
    /// Exceeded its timeout budget; resumable
    Timeout,
    /// Finding thresholds tripped; resumable
    Escalated,
    /// All phases completed
    Completed,
    /// Failed (terminal)
    Failed,
    /// Abandoned by the caller (terminal)
    Abandoned,
    /// Run diverged from its workflow (terminal)
    Diverged,
}

crate::simple_display! {
    ExecutionState {
        Idle => "idle",
        Running => "running",
        Paused => "paused",
        Timeout => "timeout",
        Escalated => "escalated",
        Completed => "completed",
        Failed => "failed",
        Abandoned => "abandoned",
        Diverged => "diverged",
    }
}

crate::enum_parse! {
    ExecutionState {
        "idle" => Idle,
        "running" => Running,
        "paused" => Paused,
        "timeout" => Timeout,
        "escalated" => Escalated,
        "completed" => Completed,
        "failed" => Failed,
        "abandoned" => Abandoned,
        "diverged" => Diverged,
    }
}

impl ExecutionState {
    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Abandoned | Self::Diverged)
    }

    /// States a resume is valid from.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Escalated)
    }

    /// The transition table. Escalation enters via `running`; `timeout` and
    /// `escalated` both re-enter `running` on resume.
    pub fn permitted_targets(&self) -> &'static [ExecutionState] {
        use ExecutionState::*;
        match self {
            Idle => &[Running],
            Running => &[Completed, Failed, Paused, Abandoned, Diverged, Timeout, Escalated],
            Paused => &[Running, Abandoned],
            Timeout => &[Running, Failed],
            Escalated => &[Running, Completed, Failed],
            Completed | Failed | Abandoned | Diverged => &[],
        }
    }

    pub fn can_transition_to(&self, target: ExecutionState) -> bool {
        self.permitted_targets().contains(&target)
    }
}

/// Rejected state change, reported with both endpoints so the caller can
/// reconcile against its own view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition from '{from}' to '{to}'")]
pub struct InvalidTransition {
    pub from: ExecutionState,
    pub to: ExecutionState,
}

/// A single run of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub execution_id: ExecutionId,
    pub workflow_name: String,
    pub state: ExecutionState,
    /// Name of the step currently holding the live token. NULL once terminal.
    pub current_step_name: Option<String>,
    /// Project scope for findings produced by this run.
    pub project_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    /// Wall-clock budget; enforced by the timeout sweep, not in-line.
    pub timeout_ms: Option<u64>,
    pub started_at_ms: Option<u64>,
    pub updated_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl Execution {
    /// Create a fresh execution in `idle`.
    pub fn new(execution_id: ExecutionId, workflow_name: impl Into<String>, now_ms: u64) -> Self {
        Self {
            execution_id,
            workflow_name: workflow_name.into(),
            state: ExecutionState::Idle,
            current_step_name: None,
            project_id: None,
            metadata: None,
            timeout_ms: None,
            started_at_ms: None,
            updated_at_ms: now_ms,
            completed_at_ms: None,
            duration_ms: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply a state transition with its bookkeeping.
    ///
    /// First entry into `running` stamps `started_at`. Entry into any
    /// terminal state stamps `completed_at`, computes `duration_ms`
    /// (saturating, so a zero-tick run is 0 and never negative), and clears
    /// `current_step_name`.
    pub fn transition(&mut self, target: ExecutionState, now_ms: u64) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(target) {
            return Err(InvalidTransition { from: self.state, to: target });
        }
        if target == ExecutionState::Running && self.started_at_ms.is_none() {
            self.started_at_ms = Some(now_ms);
        }
        if target.is_terminal() {
            self.completed_at_ms = Some(now_ms);
            self.duration_ms = Some(now_ms.saturating_sub(self.started_at_ms.unwrap_or(now_ms)));
            self.current_step_name = None;
        }
        self.state = target;
        self.updated_at_ms = now_ms;
        Ok(())
    }

    /// Whether the timeout budget is exhausted at `now_ms`. Only meaningful
    /// for running executions; others report false.
    pub fn timed_out(&self, now_ms: u64) -> bool {
        if self.state != ExecutionState::Running {
            return false;
        }
        match (self.timeout_ms, self.started_at_ms) {
            (Some(budget), Some(started)) => now_ms.saturating_sub(started) > budget,
            _ => false,
        }
    }
}

crate::builder! {
    pub struct ExecutionBuilder => Execution {
        into {
            execution_id: ExecutionId = "exe-test",
            workflow_name: String = "test-workflow",
        }
        set {
            state: ExecutionState = ExecutionState::Running,
            updated_at_ms: u64 = 1_000_000,
        }
        option {
            current_step_name: String = None,
            project_id: i64 = None,
            metadata: serde_json::Value = None,
            timeout_ms: u64 = None,
            started_at_ms: u64 = Some(1_000_000),
            completed_at_ms: u64 = None,
            duration_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
