// SPDX-License-Identifier: MIT

//! Immutable artifact rows. Content is base64-encoded into a TEXT column on
//! insert and decoded on read; an UPDATE trigger in the schema refuses any
//! mutation after insert.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cue_core::{Artifact, ArtifactId, ArtifactKind, ExecutionId};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{json, StoreError};

/// Artifact listing entry; everything but the content payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArtifactMeta {
    pub artifact_id: ArtifactId,
    pub step_name: String,
    pub kind: ArtifactKind,
    pub name: String,
    pub content_type: Option<String>,
    pub size_bytes: u64,
    pub created_at_ms: u64,
}

pub fn insert(conn: &Connection, artifact: &Artifact) -> Result<(), StoreError> {
    conn.prepare_cached(
        "INSERT INTO artifacts (
            artifact_id, execution_id, step_name, artifact_type, name,
            content, content_type, size_bytes, metadata, created_at_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?
    .execute(params![
        artifact.artifact_id.as_str(),
        artifact.execution_id.as_str(),
        artifact.step_name,
        artifact.kind.to_string(),
        artifact.name,
        BASE64.encode(&artifact.content),
        artifact.content_type,
        artifact.size_bytes as i64,
        json::encode_opt(&artifact.metadata)?,
        artifact.created_at_ms as i64,
    ])?;
    Ok(())
}

pub fn get(conn: &Connection, artifact_id: &str) -> Result<Option<Artifact>, StoreError> {
    conn.prepare_cached(
        "SELECT artifact_id, execution_id, step_name, artifact_type, name,
                content, content_type, size_bytes, metadata, created_at_ms
         FROM artifacts WHERE artifact_id = ?1",
    )?
    .query_row([artifact_id], from_row)
    .optional()?
    .transpose()
}

/// Listing for an execution, optionally narrowed to one step. Content is
/// never loaded here.
pub fn list_meta(
    conn: &Connection,
    execution_id: &str,
    step_name: Option<&str>,
) -> Result<Vec<ArtifactMeta>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT artifact_id, step_name, artifact_type, name, content_type,
                size_bytes, created_at_ms
         FROM artifacts
         WHERE execution_id = ?1 AND (?2 IS NULL OR step_name = ?2)
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![execution_id, step_name], |row| {
        let kind_text: String = row.get(2)?;
        Ok((kind_text, row.get::<_, String>(0)?, row.get::<_, String>(1)?,
            row.get::<_, String>(3)?, row.get::<_, Option<String>>(4)?,
            row.get::<_, i64>(5)?, row.get::<_, i64>(6)?))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (kind_text, id, step, name, content_type, size, created) = row?;
        let kind = ArtifactKind::parse(&kind_text)
            .ok_or_else(|| StoreError::Encoding(format!("unknown artifact type '{kind_text}'")))?;
        out.push(ArtifactMeta {
            artifact_id: ArtifactId::from_string(id),
            step_name: step,
            kind,
            name,
            content_type,
            size_bytes: size as u64,
            created_at_ms: created as u64,
        });
    }
    Ok(out)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<Artifact, StoreError>> {
    let kind_text: String = row.get(3)?;
    let content_text: String = row.get(5)?;
    let metadata_text: Option<String> = row.get(8)?;
    Ok((|| {
        let kind = ArtifactKind::parse(&kind_text)
            .ok_or_else(|| StoreError::Encoding(format!("unknown artifact type '{kind_text}'")))?;
        let content = BASE64
            .decode(content_text.as_bytes())
            .map_err(|e| StoreError::Encoding(format!("artifact content: {e}")))?;
        Ok(Artifact {
            artifact_id: ArtifactId::from_string(row.get::<_, String>(0)?),
            execution_id: ExecutionId::from_string(row.get::<_, String>(1)?),
            step_name: row.get(2)?,
            kind,
            name: row.get(4)?,
            content,
            content_type: row.get(6)?,
            size_bytes: row.get::<_, i64>(7)? as u64,
            metadata: json::decode_opt(metadata_text)?,
            created_at_ms: row.get::<_, i64>(9)? as u64,
        })
    })())
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
