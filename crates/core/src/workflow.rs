// SPDX-License-Identifier: MIT

//! Workflow definitions: ordered phases with dependency declarations.
//!
//! Definitions come from the content registry and are read-only to the
//! engine. Validation happens at load time so the sequencer can trust the
//! shape: unique phase names, dependency references that resolve, and an
//! acyclic dependency graph.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Keywords and tags that suggest a workflow to a caller browsing the
/// registry. Advisory; the engine never matches on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Design-time declaration of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDef {
    pub phase_name: String,
    pub agent_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Advisory in v1; the sequencer runs phases one at a time regardless.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_parallel: bool,
}

/// A named, ordered set of phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub phases: Vec<PhaseDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Triggers>,
}

/// Why a workflow definition was rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowValidationError {
    #[error("workflow '{0}' has no phases")]
    NoPhases(String),

    #[error("workflow '{workflow}' declares phase '{phase}' more than once")]
    DuplicatePhase { workflow: String, phase: String },

    #[error("phase '{phase}' depends on unknown phase '{dependency}'")]
    UnknownDependency { phase: String, dependency: String },

    #[error("workflow '{workflow}' has a dependency cycle through '{phase}'")]
    CyclicDependencies { workflow: String, phase: String },

    #[error("workflow '{0}' has no phase without dependencies to start from")]
    NoStartingPhase(String),
}

impl WorkflowDef {
    /// Validate shape: at least one phase, unique phase names, resolvable
    /// dependency references, an acyclic graph, and a starting phase.
    pub fn validate(&self) -> Result<(), WorkflowValidationError> {
        if self.phases.is_empty() {
            return Err(WorkflowValidationError::NoPhases(self.name.clone()));
        }

        let mut names = HashSet::new();
        for phase in &self.phases {
            if !names.insert(phase.phase_name.as_str()) {
                return Err(WorkflowValidationError::DuplicatePhase {
                    workflow: self.name.clone(),
                    phase: phase.phase_name.clone(),
                });
            }
        }

        for phase in &self.phases {
            for dep in &phase.depends_on {
                if !names.contains(dep.as_str()) {
                    return Err(WorkflowValidationError::UnknownDependency {
                        phase: phase.phase_name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Starting-phase check comes first: a workflow where every phase
        // declares dependencies necessarily also contains a cycle, and the
        // missing entry point is the more actionable report.
        if self.starting_phase().is_none() {
            return Err(WorkflowValidationError::NoStartingPhase(self.name.clone()));
        }

        self.check_acyclic()?;

        Ok(())
    }

    /// The first phase in declared order with no dependencies.
    pub fn starting_phase(&self) -> Option<&PhaseDef> {
        self.phases.iter().find(|p| p.depends_on.is_empty())
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseDef> {
        self.phases.iter().find(|p| p.phase_name == name)
    }

    pub fn phase_index(&self, name: &str) -> Option<usize> {
        self.phases.iter().position(|p| p.phase_name == name)
    }

    // Iterative three-color DFS over the dependency graph. Recursion is
    // avoided so a pathological registry entry cannot blow the stack.
    fn check_acyclic(&self) -> Result<(), WorkflowValidationError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let index: HashMap<&str, &PhaseDef> =
            self.phases.iter().map(|p| (p.phase_name.as_str(), p)).collect();
        let mut marks: HashMap<&str, Mark> =
            self.phases.iter().map(|p| (p.phase_name.as_str(), Mark::Unvisited)).collect();

        for root in &self.phases {
            if marks[root.phase_name.as_str()] != Mark::Unvisited {
                continue;
            }
            // stack of (phase, next dependency index to visit)
            let mut stack: Vec<(&str, usize)> = vec![(root.phase_name.as_str(), 0)];
            marks.insert(root.phase_name.as_str(), Mark::InProgress);

            while let Some((name, dep_idx)) = stack.pop() {
                let deps = index.get(name).map(|p| p.depends_on.as_slice()).unwrap_or(&[]);
                if dep_idx >= deps.len() {
                    marks.insert(name, Mark::Done);
                    continue;
                }
                stack.push((name, dep_idx + 1));
                let dep = deps[dep_idx].as_str();
                match marks.get(dep).copied().unwrap_or(Mark::Done) {
                    Mark::InProgress => {
                        return Err(WorkflowValidationError::CyclicDependencies {
                            workflow: self.name.clone(),
                            phase: dep.to_string(),
                        });
                    }
                    Mark::Unvisited => {
                        marks.insert(dep, Mark::InProgress);
                        stack.push((dep, 0));
                    }
                    Mark::Done => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
