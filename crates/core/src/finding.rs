// SPDX-License-Identifier: MIT

//! Findings: structured observations produced during a run.
//!
//! Findings are either scoped to a project or global. Severity ordering
//! matters: escalation thresholds count findings at-or-above a level.

use crate::id::{ExecutionId, FindingId, StepId};
use serde::{Deserialize, Serialize};

/// Severity scale, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

crate::simple_display! {
    Severity {
        Info => "info",
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

crate::enum_parse! {
    Severity {
        "info" => Info,
        "low" => Low,
        "medium" => Medium,
        "high" => High,
        "critical" => Critical,
    }
}

impl Severity {
    pub const ALL: [Severity; 5] =
        [Severity::Info, Severity::Low, Severity::Medium, Severity::High, Severity::Critical];
}

/// A structured observation, optionally project-scoped or global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub finding_id: FindingId,
    pub execution_id: ExecutionId,
    pub step_id: Option<StepId>,
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Global findings are visible from every project scope.
    #[serde(default)]
    pub is_global: bool,
    pub project_id: Option<i64>,
    /// Free-form locator (file:line, URL, endpoint).
    pub location: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at_ms: u64,
}

impl Finding {
    /// Whether this finding counts as a blocker for escalation purposes:
    /// high-or-critical and flagged `blocking` in metadata.
    pub fn is_blocking(&self) -> bool {
        self.severity >= Severity::High
            && self
                .metadata
                .as_ref()
                .and_then(|m| m.get("blocking"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
    }
}

/// Filters for finding queries. All fields are conjunctive; empty means
/// no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingFilter {
    pub execution_id: Option<ExecutionId>,
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severities: Vec<Severity>,
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Full-text phrase matched against title/description/tags/category.
    pub search: Option<String>,
    pub limit: Option<u32>,
}

#[cfg(test)]
#[path = "finding_tests.rs"]
mod tests;
