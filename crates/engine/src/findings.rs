// SPDX-License-Identifier: MIT

//! Finding writes and queries, with escalation evaluation on every write.

use cue_core::{
    Clock, ExecutionId, ExecutionState, Finding, FindingFilter, FindingId, Severity, StepId,
    TelemetryEvent,
};
use cue_store::{executions, findings, projects};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::EngineError;
use crate::Engine;

/// Inputs to [`Engine::record_finding`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFinding {
    pub execution_id: String,
    pub step_id: Option<String>,
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_global: bool,
    pub project_path: Option<String>,
    pub location: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl<C: Clock> Engine<C> {
    /// Store a finding and evaluate the escalation thresholds for its
    /// execution. Returns the stored finding and the execution state
    /// afterwards (`escalated` when a threshold tripped on this write).
    pub fn record_finding(
        &self,
        new: NewFinding,
    ) -> Result<(Finding, ExecutionState), EngineError> {
        if new.title.is_empty() || new.category.is_empty() {
            return Err(EngineError::InvalidArguments(
                "finding title and category are required".to_string(),
            ));
        }
        let now = self.now_ms();
        self.store.transaction(|conn| {
            let mut execution = executions::get(conn, &new.execution_id)?
                .ok_or_else(|| EngineError::ExecutionNotFound(new.execution_id.clone()))?;

            let project_id = match &new.project_path {
                Some(path) => projects::get_by_path(conn, path)?.map(|p| p.id),
                None => execution.project_id,
            };
            let finding = Finding {
                finding_id: FindingId::new(),
                execution_id: ExecutionId::from_string(&new.execution_id),
                step_id: new.step_id.clone().map(StepId::from_string),
                severity: new.severity,
                category: new.category.clone(),
                title: new.title.clone(),
                description: new.description.clone(),
                tags: new.tags.clone(),
                is_global: new.is_global,
                project_id,
                location: new.location.clone(),
                metadata: new.metadata.clone(),
                created_at_ms: now,
            };
            findings::insert(conn, &finding)?;

            // threshold check applies to runs that are still moving
            if execution.state == ExecutionState::Running {
                let all = findings::query(
                    conn,
                    &FindingFilter {
                        execution_id: Some(finding.execution_id.clone()),
                        ..FindingFilter::default()
                    },
                )?;
                if let Some(reason) = self.escalation.evaluate(&all) {
                    execution.transition(ExecutionState::Escalated, now)?;
                    executions::update(conn, &execution)?;
                    self.record_telemetry_on(
                        conn,
                        TelemetryEvent::new("escalation_triggered", now)
                            .for_execution(finding.execution_id.clone())
                            .with_metadata(json!({"reason": reason})),
                    );
                    info!(execution_id = %finding.execution_id, %reason, "execution escalated");
                }
            }

            Ok((finding, execution.state))
        })
    }

    /// Conjunctive finding query; `project_path`, when given, applies the
    /// project-scope rule (project rows plus globals).
    pub fn query_findings(
        &self,
        filter: &FindingFilter,
        project_path: Option<&str>,
    ) -> Result<Vec<Finding>, EngineError> {
        self.store.with_conn(|conn| match project_path {
            Some(path) => {
                let project = projects::get_by_path(conn, path)?
                    .ok_or_else(|| EngineError::NotFound(format!("project '{path}'")))?;
                findings::for_project(conn, project.id, filter).map_err(EngineError::from)
            }
            None => findings::query(conn, filter).map_err(EngineError::from),
        })
    }

    pub fn finding_counts(
        &self,
        filter: &FindingFilter,
    ) -> Result<Vec<(Severity, u32)>, EngineError> {
        self.store.with_conn(|conn| {
            findings::counts_by_severity(conn, filter, None).map_err(EngineError::from)
        })
    }

    /// Register (or touch) a project association.
    pub fn register_project(
        &self,
        name: &str,
        path: &str,
        is_git_repo: bool,
        metadata: Option<serde_json::Value>,
    ) -> Result<cue_core::ProjectAssociation, EngineError> {
        if name.is_empty() || path.is_empty() {
            return Err(EngineError::InvalidArguments(
                "project name and path are required".to_string(),
            ));
        }
        let now = self.now_ms();
        self.store.transaction(|conn| {
            projects::upsert(conn, name, path, is_git_repo, metadata.as_ref(), now)
                .map_err(EngineError::from)
        })
    }
}

#[cfg(test)]
#[path = "findings_tests.rs"]
mod tests;
