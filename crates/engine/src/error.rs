// SPDX-License-Identifier: MIT

//! Engine error vocabulary.
//!
//! One enum covers every failure the operation surface can report. `kind()`
//! is the stable machine-readable discriminator the transport puts on the
//! wire; messages are for humans.

use cue_core::{ExecutionState, InvalidStepTransition, InvalidTransition, StepStatus};
use cue_store::{MigrationError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    // -- input errors --
    #[error("malformed token: {0}")]
    TokenMalformed(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("execution id '{0}' already exists")]
    DuplicateExecutionId(String),

    // -- state errors --
    #[error("invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("token was issued for step '{token_step}' but the execution has moved on")]
    TokenStepMismatch { token_step: String, current_step: Option<String> },

    #[error("step '{step_name}' is {status}, not running")]
    StepNotRunning { step_name: String, status: StepStatus },

    #[error("execution is {0}; only timed-out or escalated executions can be resumed")]
    NotResumable(ExecutionState),

    #[error("execution is {0} and cannot advance")]
    NotRunnable(ExecutionState),

    #[error("execution already reached terminal state {0}")]
    AlreadyTerminal(ExecutionState),

    // -- not-found errors --
    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("workflow '{0}' has no phases")]
    NoPhases(String),

    #[error("workflow '{0}' has no phase without dependencies to start from")]
    NoStartingPhase(String),

    #[error("workflow '{0}' has a dependency cycle")]
    CyclicDependencies(String),

    #[error("execution '{0}' not found")]
    ExecutionNotFound(String),

    #[error("agent '{0}' not found in the content registry")]
    AgentNotFound(String),

    #[error("{0} not found")]
    NotFound(String),

    // -- timing errors --
    #[error("token expired; fetch the current step for a fresh one")]
    TokenExpired,

    // -- dependency errors --
    #[error("step '{step_name}' has incomplete dependencies: {missing:?}")]
    DependenciesNotMet { step_name: String, missing: Vec<String> },

    // -- validation errors --
    #[error("contract validation failed: {0}")]
    ContractValidation(String),

    // -- infrastructure errors --
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl EngineError {
    /// Stable discriminator for the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::TokenMalformed(_) => "TokenMalformed",
            EngineError::InvalidArguments(_) => "InvalidArguments",
            EngineError::DuplicateExecutionId(_) => "DuplicateExecutionId",
            EngineError::InvalidTransition { .. } => "InvalidTransition",
            EngineError::TokenStepMismatch { .. } => "TokenStepMismatch",
            EngineError::StepNotRunning { .. } => "StepNotRunning",
            EngineError::NotResumable(_) => "NotResumable",
            EngineError::NotRunnable(_) => "NotRunnable",
            EngineError::AlreadyTerminal(_) => "AlreadyTerminal",
            EngineError::WorkflowNotFound(_) => "WorkflowNotFound",
            EngineError::NoPhases(_) => "NoPhases",
            EngineError::NoStartingPhase(_) => "NoStartingPhase",
            EngineError::CyclicDependencies(_) => "CyclicDependencies",
            EngineError::ExecutionNotFound(_) => "ExecutionNotFound",
            EngineError::AgentNotFound(_) => "AgentNotFound",
            EngineError::NotFound(_) => "NotFound",
            EngineError::TokenExpired => "TokenExpired",
            EngineError::DependenciesNotMet { .. } => "DependenciesNotMet",
            EngineError::ContractValidation(_) => "ContractValidationError",
            EngineError::Store(_) => "StoreError",
            EngineError::Migration(_) => "MigrationError",
        }
    }
}

impl From<InvalidTransition> for EngineError {
    fn from(e: InvalidTransition) -> Self {
        EngineError::InvalidTransition { from: e.from.to_string(), to: e.to.to_string() }
    }
}

impl From<InvalidStepTransition> for EngineError {
    fn from(e: InvalidStepTransition) -> Self {
        EngineError::InvalidTransition { from: e.from.to_string(), to: e.to.to_string() }
    }
}
