// SPDX-License-Identifier: MIT

//! Immutable artifacts produced during a run.

use crate::id::{ArtifactId, ExecutionId};
use serde::{Deserialize, Serialize};

/// What kind of blob an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    File,
    Data,
    Report,
    Finding,
}

crate::simple_display! {
    ArtifactKind {
        File => "file",
        Data => "data",
        Report => "report",
        Finding => "finding",
    }
}

crate::enum_parse! {
    ArtifactKind {
        "file" => File,
        "data" => Data,
        "report" => Report,
        "finding" => Finding,
    }
}

/// An immutable blob addressable by id. Written once; the store refuses
/// updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: ArtifactId,
    pub execution_id: ExecutionId,
    pub step_name: String,
    pub kind: ArtifactKind,
    pub name: String,
    /// Raw bytes; the store base64-encodes on the way in and decodes on the
    /// way out.
    pub content: Vec<u8>,
    pub content_type: Option<String>,
    pub size_bytes: u64,
    pub metadata: Option<serde_json::Value>,
    pub created_at_ms: u64,
}
