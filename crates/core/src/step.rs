// SPDX-License-Identifier: MIT

//! Step status machine and the runtime step record.
//!
//! A step is the runtime instance of a workflow phase within one execution.
//! The one live continuation token for a step is stored on the step row and
//! cleared the moment the step leaves `running` -- the token/status coupling
//! is an invariant, so both moves happen in [`Step::transition`].

use crate::id::{ArtifactId, ExecutionId, FindingId, StepId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Declared but not yet reached
    Pending,
    /// Holds the live token; the caller is doing the work
    Running,
    /// Work recorded via advance
    Completed,
    /// Step failed
    Failed,
    /// Dependencies made the step unreachable
    Skipped,
}

crate::simple_display! {
    StepStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Skipped => "skipped",
    }
}

crate::enum_parse! {
    StepStatus {
        "pending" => Pending,
        "running" => Running,
        "completed" => Completed,
        "failed" => Failed,
        "skipped" => Skipped,
    }
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    pub fn permitted_targets(&self) -> &'static [StepStatus] {
        use StepStatus::*;
        match self {
            Pending => &[Running, Skipped],
            Running => &[Completed, Failed],
            Completed | Failed | Skipped => &[],
        }
    }

    pub fn can_transition_to(&self, target: StepStatus) -> bool {
        self.permitted_targets().contains(&target)
    }
}

/// Rejected step status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid step transition from '{from}' to '{to}'")]
pub struct InvalidStepTransition {
    pub from: StepStatus,
    pub to: StepStatus,
}

/// Structured output the caller reports when completing a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifact_ids: Vec<ArtifactId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finding_ids: Vec<FindingId>,
    /// Advisory only; the sequencer still applies its own tie-breaking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_hint: Option<String>,
}

impl StepOutput {
    pub fn summary(text: impl Into<String>) -> Self {
        Self { summary: text.into(), ..Self::default() }
    }
}

/// Runtime instance of a workflow phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub step_id: StepId,
    pub execution_id: ExecutionId,
    /// Phase name; unique within the execution.
    pub step_name: String,
    pub agent_name: String,
    pub status: StepStatus,
    pub depends_on: Vec<String>,
    /// The one live continuation token. Non-null iff `status == running`.
    pub token: Option<String>,
    pub output: Option<StepOutput>,
    pub error: Option<String>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl Step {
    /// Create a pending step for a phase.
    pub fn new(
        execution_id: ExecutionId,
        step_name: impl Into<String>,
        agent_name: impl Into<String>,
        depends_on: Vec<String>,
    ) -> Self {
        Self {
            step_id: StepId::new(),
            execution_id,
            step_name: step_name.into(),
            agent_name: agent_name.into(),
            status: StepStatus::Pending,
            depends_on,
            token: None,
            output: None,
            error: None,
            started_at_ms: None,
            completed_at_ms: None,
            duration_ms: None,
        }
    }

    /// Apply a status transition with its bookkeeping.
    ///
    /// Entering `running` stamps `started_at`; any terminal entry stamps
    /// `completed_at`, computes a saturating `duration_ms`, and drops the
    /// token. The caller stores the token separately after a successful
    /// transition into `running`.
    pub fn transition(&mut self, target: StepStatus, now_ms: u64) -> Result<(), InvalidStepTransition> {
        if !self.status.can_transition_to(target) {
            return Err(InvalidStepTransition { from: self.status, to: target });
        }
        if target == StepStatus::Running {
            self.started_at_ms = Some(now_ms);
        }
        if target.is_terminal() {
            self.completed_at_ms = Some(now_ms);
            self.duration_ms = Some(now_ms.saturating_sub(self.started_at_ms.unwrap_or(now_ms)));
            self.token = None;
        }
        self.status = target;
        Ok(())
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
