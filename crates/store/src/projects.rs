// SPDX-License-Identifier: MIT

//! Project association rows.

use cue_core::ProjectAssociation;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{json, StoreError};

/// Register a project path, or refresh `last_used_at` if the path is already
/// known. Returns the stored row either way.
pub fn upsert(
    conn: &Connection,
    name: &str,
    path: &str,
    is_git_repo: bool,
    metadata: Option<&serde_json::Value>,
    now_ms: u64,
) -> Result<ProjectAssociation, StoreError> {
    conn.prepare_cached(
        "INSERT INTO project_associations (
            name, path, is_git_repo, metadata, discovered_at_ms, last_used_at_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(path) DO UPDATE SET last_used_at_ms = ?5",
    )?
    .execute(params![
        name,
        path,
        is_git_repo,
        metadata.map(json::encode).transpose()?,
        now_ms as i64,
    ])?;
    get_by_path(conn, path)?.ok_or_else(|| {
        StoreError::Encoding(format!("project '{path}' missing after upsert"))
    })
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<ProjectAssociation>, StoreError> {
    conn.prepare_cached(&select("WHERE id = ?1"))?
        .query_row([id], from_row)
        .optional()?
        .transpose()
}

pub fn get_by_path(conn: &Connection, path: &str) -> Result<Option<ProjectAssociation>, StoreError> {
    conn.prepare_cached(&select("WHERE path = ?1"))?
        .query_row([path], from_row)
        .optional()?
        .transpose()
}

pub fn list(conn: &Connection) -> Result<Vec<ProjectAssociation>, StoreError> {
    let mut stmt = conn.prepare_cached(&select("ORDER BY last_used_at_ms DESC"))?;
    let rows = stmt.query_map([], from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

fn select(suffix: &str) -> String {
    format!(
        "SELECT id, name, path, is_git_repo, metadata, discovered_at_ms, last_used_at_ms
         FROM project_associations {suffix}"
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<ProjectAssociation, StoreError>> {
    let metadata_text: Option<String> = row.get(4)?;
    Ok((|| {
        Ok(ProjectAssociation {
            id: row.get(0)?,
            name: row.get(1)?,
            path: row.get(2)?,
            is_git_repo: row.get(3)?,
            metadata: json::decode_opt(metadata_text)?,
            discovered_at_ms: row.get::<_, i64>(5)? as u64,
            last_used_at_ms: row.get::<_, i64>(6)? as u64,
        })
    })())
}

#[cfg(test)]
#[path = "projects_tests.rs"]
mod tests;
