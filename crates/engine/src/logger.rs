// SPDX-License-Identifier: MIT

//! The execution logger: idempotent structured logging with optional
//! contract validation.
//!
//! When a schema table is loaded, `contract_input`/`contract_output`
//! payloads are validated against the entry's layer schema before anything
//! is written; a mismatch writes nothing.

use std::collections::HashMap;

use cue_core::{Clock, LogEntry, LogFilter, LogLayer};
use cue_store::{executions, logs};
use jsonschema::Validator;

use crate::error::EngineError;
use crate::Engine;

/// Which side of a layer's contract a schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractDirection {
    Input,
    Output,
}

/// Compiled JSON Schemas keyed by `(layer, direction)`.
#[derive(Debug)]
pub struct ContractSchemas {
    validators: HashMap<(LogLayer, ContractDirection), Validator>,
}

impl ContractSchemas {
    /// Build from a JSON object shaped `{ "<layer>": { "input": {...},
    /// "output": {...} } }`. Unknown layer names are rejected.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, EngineError> {
        let table = value.as_object().ok_or_else(|| {
            EngineError::InvalidArguments("contract schema table must be an object".to_string())
        })?;
        let mut validators = HashMap::new();
        for (layer_name, directions) in table {
            let layer = LogLayer::parse(layer_name).ok_or_else(|| {
                EngineError::InvalidArguments(format!("unknown log layer '{layer_name}'"))
            })?;
            for (key, direction) in
                [("input", ContractDirection::Input), ("output", ContractDirection::Output)]
            {
                if let Some(schema) = directions.get(key) {
                    let validator = jsonschema::validator_for(schema).map_err(|e| {
                        EngineError::InvalidArguments(format!(
                            "bad {key} schema for layer '{layer_name}': {e}"
                        ))
                    })?;
                    validators.insert((layer, direction), validator);
                }
            }
        }
        Ok(Self { validators })
    }

    fn check(
        &self,
        layer: LogLayer,
        direction: ContractDirection,
        payload: &serde_json::Value,
    ) -> Result<(), EngineError> {
        if let Some(validator) = self.validators.get(&(layer, direction)) {
            validator.validate(payload).map_err(|e| {
                let side = match direction {
                    ContractDirection::Input => "input",
                    ContractDirection::Output => "output",
                };
                EngineError::ContractValidation(format!("{layer} {side}: {e}"))
            })?;
        }
        Ok(())
    }
}

impl<C: Clock> Engine<C> {
    /// Append a log entry, or return the existing row if the
    /// `(execution, layer, layer_id)` key was already written.
    pub fn log_event(&self, mut entry: LogEntry) -> Result<LogEntry, EngineError> {
        if let Some(contracts) = &self.contracts {
            if let Some(input) = &entry.contract_input {
                contracts.check(entry.layer, ContractDirection::Input, input)?;
            }
            if let Some(output) = &entry.contract_output {
                contracts.check(entry.layer, ContractDirection::Output, output)?;
            }
        }
        if entry.timestamp_ms == 0 {
            entry.timestamp_ms = self.now_ms();
        }
        self.store.transaction(|conn| {
            if !executions::exists(conn, entry.execution_id.as_str())? {
                return Err(EngineError::ExecutionNotFound(entry.execution_id.to_string()));
            }
            logs::insert_idempotent(conn, &entry).map_err(EngineError::from)
        })
    }

    pub fn query_logs(
        &self,
        execution_id: &str,
        filter: &LogFilter,
    ) -> Result<Vec<LogEntry>, EngineError> {
        self.store.with_conn(|conn| {
            if !executions::exists(conn, execution_id)? {
                return Err(EngineError::ExecutionNotFound(execution_id.to_string()));
            }
            logs::query(conn, execution_id, filter).map_err(EngineError::from)
        })
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
