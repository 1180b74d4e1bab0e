// SPDX-License-Identifier: MIT

//! Artifact writes. Reads live with the other queries.

use cue_core::{Artifact, ArtifactId, ArtifactKind, Clock, ExecutionId, TelemetryEvent};
use cue_store::{artifacts, executions, steps};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::EngineError;
use crate::Engine;

/// Inputs to [`Engine::store_artifact`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArtifact {
    pub execution_id: String,
    pub step_name: String,
    pub kind: ArtifactKind,
    pub name: String,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl<C: Clock> Engine<C> {
    /// Write an immutable artifact for a step of an execution.
    pub fn store_artifact(&self, new: NewArtifact) -> Result<Artifact, EngineError> {
        if new.name.is_empty() {
            return Err(EngineError::InvalidArguments("artifact name is empty".to_string()));
        }
        let now = self.now_ms();
        self.store.transaction(|conn| {
            if !executions::exists(conn, &new.execution_id)? {
                return Err(EngineError::ExecutionNotFound(new.execution_id.clone()));
            }
            if steps::get(conn, &new.execution_id, &new.step_name)?.is_none() {
                return Err(EngineError::InvalidArguments(format!(
                    "execution '{}' has no step '{}'",
                    new.execution_id, new.step_name
                )));
            }
            let artifact = Artifact {
                artifact_id: ArtifactId::new(),
                execution_id: ExecutionId::from_string(&new.execution_id),
                step_name: new.step_name.clone(),
                kind: new.kind,
                name: new.name.clone(),
                size_bytes: new.content.len() as u64,
                content: new.content.clone(),
                content_type: new.content_type.clone(),
                metadata: new.metadata.clone(),
                created_at_ms: now,
            };
            artifacts::insert(conn, &artifact)?;
            self.record_telemetry_on(
                conn,
                TelemetryEvent::new("artifact_stored", now)
                    .for_execution(artifact.execution_id.clone())
                    .with_step(&artifact.step_name)
                    .with_metadata(json!({"artifact_id": artifact.artifact_id,
                                          "size_bytes": artifact.size_bytes})),
            );
            Ok(artifact)
        })
    }
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
