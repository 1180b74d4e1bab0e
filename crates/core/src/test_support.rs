// SPDX-License-Identifier: MIT

//! Shared fixtures for other crates' tests.

use crate::workflow::{PhaseDef, WorkflowDef};

/// Build a phase definition without ceremony.
pub fn phase(name: &str, agent: &str, deps: &[&str]) -> PhaseDef {
    PhaseDef {
        phase_name: name.to_string(),
        agent_name: agent.to_string(),
        description: format!("{name} phase"),
        depends_on: deps.iter().map(|s| s.to_string()).collect(),
        allow_parallel: false,
    }
}

/// The canonical three-phase workflow: design -> implement -> review.
pub fn three_phase(name: &str) -> WorkflowDef {
    WorkflowDef {
        name: name.to_string(),
        description: "design, implement, review".to_string(),
        phases: vec![
            phase("design", "architect", &[]),
            phase("implement", "implementer", &["design"]),
            phase("review", "reviewer", &["implement"]),
        ],
        complexity: Some("medium".to_string()),
        triggers: None,
    }
}

/// A single-phase workflow for minimal scenarios.
pub fn one_phase(name: &str, agent: &str) -> WorkflowDef {
    WorkflowDef {
        name: name.to_string(),
        description: "single phase".to_string(),
        phases: vec![phase("execute", agent, &[])],
        complexity: None,
        triggers: None,
    }
}

/// Diamond workflow: root -> (left, right) -> merge. Exercises dependency
/// tie-breaking.
pub fn diamond(name: &str) -> WorkflowDef {
    WorkflowDef {
        name: name.to_string(),
        description: "diamond dependencies".to_string(),
        phases: vec![
            phase("root", "architect", &[]),
            phase("left", "implementer", &["root"]),
            phase("right", "implementer", &["root"]),
            phase("merge", "reviewer", &["left", "right"]),
        ],
        complexity: None,
        triggers: None,
    }
}
