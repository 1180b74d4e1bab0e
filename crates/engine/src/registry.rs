// SPDX-License-Identifier: MIT

//! Content-registry access: workflow definitions and agent personas.
//!
//! The engine reads the registry through these helpers so every caller gets
//! the same not-found and validation mapping. Registration operations also
//! live here; definitions are validated on the way in so the sequencer can
//! trust what it loads (and it still revalidates defensively on load).

use cue_core::{AgentPersona, Clock, WorkflowDef, WorkflowValidationError};
use cue_store::{registry, Connection};

use crate::error::EngineError;
use crate::Engine;

/// Load and validate a workflow definition.
pub(crate) fn load_workflow(conn: &Connection, name: &str) -> Result<WorkflowDef, EngineError> {
    let workflow = registry::get_workflow(conn, name)?
        .ok_or_else(|| EngineError::WorkflowNotFound(name.to_string()))?;
    workflow.validate().map_err(map_validation)?;
    Ok(workflow)
}

/// Load an agent persona; missing personas surface as [`EngineError::AgentNotFound`].
pub(crate) fn load_agent(conn: &Connection, name: &str) -> Result<AgentPersona, EngineError> {
    registry::get_agent(conn, name)?
        .ok_or_else(|| EngineError::AgentNotFound(name.to_string()))
}

pub(crate) fn map_validation(e: WorkflowValidationError) -> EngineError {
    match e {
        WorkflowValidationError::NoPhases(name) => EngineError::NoPhases(name),
        WorkflowValidationError::NoStartingPhase(name) => EngineError::NoStartingPhase(name),
        WorkflowValidationError::CyclicDependencies { workflow, .. } => {
            EngineError::CyclicDependencies(workflow)
        }
        e @ (WorkflowValidationError::DuplicatePhase { .. }
        | WorkflowValidationError::UnknownDependency { .. }) => {
            EngineError::InvalidArguments(e.to_string())
        }
    }
}

impl<C: Clock> Engine<C> {
    /// Store a workflow definition, validating its shape first.
    /// Returns the content hash of the stored phase blob.
    pub fn register_workflow(&self, workflow: &WorkflowDef) -> Result<String, EngineError> {
        if workflow.name.is_empty() {
            return Err(EngineError::InvalidArguments("workflow name is empty".to_string()));
        }
        workflow.validate().map_err(map_validation)?;
        let now = self.now_ms();
        self.store.transaction(|conn| {
            registry::upsert_workflow(conn, workflow, now).map_err(EngineError::from)
        })
    }

    /// Store an agent persona.
    pub fn register_agent(&self, agent: &AgentPersona) -> Result<(), EngineError> {
        if agent.name.is_empty() {
            return Err(EngineError::InvalidArguments("agent name is empty".to_string()));
        }
        let now = self.now_ms();
        self.store.transaction(|conn| {
            registry::upsert_agent(conn, agent, now).map_err(EngineError::from)
        })
    }

    pub fn list_workflows(&self) -> Result<Vec<WorkflowDef>, EngineError> {
        self.store.with_conn(|conn| registry::list_workflows(conn).map_err(EngineError::from))
    }

    pub fn get_workflow(&self, name: &str) -> Result<WorkflowDef, EngineError> {
        self.store.with_conn(|conn| {
            registry::get_workflow(conn, name)?
                .ok_or_else(|| EngineError::NotFound(format!("workflow '{name}'")))
        })
    }
}
