// SPDX-License-Identifier: MIT

//! Content registry tables: workflow definitions and agent personas.
//!
//! The engine only reads these. The write path exists for the registration
//! operations and for whatever external sync populates the registry; a
//! sha-256 hash over the phase blob is stored so sync tools can detect
//! drift without comparing full definitions.

use cue_core::{AgentPersona, Triggers, WorkflowDef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};

use crate::{json, StoreError};

pub fn upsert_workflow(
    conn: &Connection,
    workflow: &WorkflowDef,
    now_ms: u64,
) -> Result<String, StoreError> {
    let phases = json::encode(&workflow.phases)?;
    let hash = format!("{:x}", Sha256::digest(phases.as_bytes()));
    conn.prepare_cached(
        "INSERT INTO workflows (name, description, phases, complexity, triggers, hash, updated_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(name) DO UPDATE SET
            description = ?2, phases = ?3, complexity = ?4, triggers = ?5,
            hash = ?6, updated_at_ms = ?7",
    )?
    .execute(params![
        workflow.name,
        workflow.description,
        phases,
        workflow.complexity,
        json::encode_opt(&workflow.triggers)?,
        hash,
        now_ms as i64,
    ])?;
    Ok(hash)
}

pub fn get_workflow(conn: &Connection, name: &str) -> Result<Option<WorkflowDef>, StoreError> {
    conn.prepare_cached(
        "SELECT name, description, phases, complexity, triggers FROM workflows WHERE name = ?1",
    )?
    .query_row([name], workflow_from_row)
    .optional()?
    .transpose()
}

pub fn list_workflows(conn: &Connection) -> Result<Vec<WorkflowDef>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT name, description, phases, complexity, triggers FROM workflows ORDER BY name",
    )?;
    let rows = stmt.query_map([], workflow_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

pub fn upsert_agent(conn: &Connection, agent: &AgentPersona, now_ms: u64) -> Result<(), StoreError> {
    conn.prepare_cached(
        "INSERT INTO agents (name, description, content, updated_at_ms)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO UPDATE SET
            description = ?2, content = ?3, updated_at_ms = ?4",
    )?
    .execute(params![agent.name, agent.description, agent.content, now_ms as i64])?;
    Ok(())
}

pub fn get_agent(conn: &Connection, name: &str) -> Result<Option<AgentPersona>, StoreError> {
    conn.prepare_cached("SELECT name, description, content FROM agents WHERE name = ?1")?
        .query_row([name], |row| {
            Ok(AgentPersona {
                name: row.get(0)?,
                description: row.get(1)?,
                content: row.get(2)?,
            })
        })
        .optional()
        .map_err(StoreError::from)
}

pub fn agent_exists(conn: &Connection, name: &str) -> Result<bool, StoreError> {
    let found: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM agents WHERE name = ?1)")?
        .query_row([name], |row| row.get(0))?;
    Ok(found)
}

fn workflow_from_row(row: &Row<'_>) -> rusqlite::Result<Result<WorkflowDef, StoreError>> {
    let phases_text: String = row.get(2)?;
    let triggers_text: Option<String> = row.get(4)?;
    Ok((|| {
        Ok(WorkflowDef {
            name: row.get(0)?,
            description: row.get(1)?,
            phases: json::decode(&phases_text)?,
            complexity: row.get(3)?,
            triggers: json::decode_opt::<Triggers>(triggers_text)?,
        })
    })())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
