// SPDX-License-Identifier: MIT

//! Step rows. `(execution_id, step_name)` is the natural key; `step_id`
//! exists for external references (findings, logs).

use std::collections::HashSet;

use cue_core::{ExecutionId, Step, StepId, StepStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{json, StoreError};

pub fn insert(conn: &Connection, step: &Step) -> Result<(), StoreError> {
    conn.prepare_cached(
        "INSERT INTO steps (
            step_id, execution_id, step_name, agent_name, status, depends_on,
            token, output, error, started_at_ms, completed_at_ms, duration_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?
    .execute(params![
        step.step_id.as_str(),
        step.execution_id.as_str(),
        step.step_name,
        step.agent_name,
        step.status.to_string(),
        json::encode(&step.depends_on)?,
        step.token,
        json::encode_opt(&step.output)?,
        step.error,
        step.started_at_ms.map(|v| v as i64),
        step.completed_at_ms.map(|v| v as i64),
        step.duration_ms.map(|v| v as i64),
    ])?;
    Ok(())
}

pub fn update(conn: &Connection, step: &Step) -> Result<(), StoreError> {
    conn.prepare_cached(
        "UPDATE steps SET
            status = ?2, token = ?3, output = ?4, error = ?5,
            started_at_ms = ?6, completed_at_ms = ?7, duration_ms = ?8
         WHERE step_id = ?1",
    )?
    .execute(params![
        step.step_id.as_str(),
        step.status.to_string(),
        step.token,
        json::encode_opt(&step.output)?,
        step.error,
        step.started_at_ms.map(|v| v as i64),
        step.completed_at_ms.map(|v| v as i64),
        step.duration_ms.map(|v| v as i64),
    ])?;
    Ok(())
}

pub fn get(
    conn: &Connection,
    execution_id: &str,
    step_name: &str,
) -> Result<Option<Step>, StoreError> {
    conn.prepare_cached(&select("WHERE execution_id = ?1 AND step_name = ?2"))?
        .query_row([execution_id, step_name], from_row)
        .optional()?
        .transpose()
}

/// Steps in creation order -- the run's history.
pub fn list_for_execution(conn: &Connection, execution_id: &str) -> Result<Vec<Step>, StoreError> {
    let mut stmt = conn.prepare_cached(&select("WHERE execution_id = ?1 ORDER BY rowid"))?;
    let rows = stmt.query_map([execution_id], from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

/// Names of this execution's completed steps; the dependency-satisfaction set.
pub fn completed_names(
    conn: &Connection,
    execution_id: &str,
) -> Result<HashSet<String>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT step_name FROM steps WHERE execution_id = ?1 AND status = 'completed'",
    )?;
    let rows = stmt.query_map([execution_id], |row| row.get::<_, String>(0))?;
    let mut out = HashSet::new();
    for row in rows {
        out.insert(row?);
    }
    Ok(out)
}

fn select(suffix: &str) -> String {
    format!(
        "SELECT step_id, execution_id, step_name, agent_name, status, depends_on,
                token, output, error, started_at_ms, completed_at_ms, duration_ms
         FROM steps {suffix}"
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<Step, StoreError>> {
    let status_text: String = row.get(4)?;
    let depends_text: String = row.get(5)?;
    let output_text: Option<String> = row.get(7)?;
    Ok((|| {
        let status = StepStatus::parse(&status_text)
            .ok_or_else(|| StoreError::Encoding(format!("unknown step status '{status_text}'")))?;
        Ok(Step {
            step_id: StepId::from_string(row.get::<_, String>(0)?),
            execution_id: ExecutionId::from_string(row.get::<_, String>(1)?),
            step_name: row.get(2)?,
            agent_name: row.get(3)?,
            status,
            depends_on: json::decode(&depends_text)?,
            token: row.get(6)?,
            output: json::decode_opt(output_text)?,
            error: row.get(8)?,
            started_at_ms: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
            completed_at_ms: row.get::<_, Option<i64>>(10)?.map(|v| v as u64),
            duration_ms: row.get::<_, Option<i64>>(11)?.map(|v| v as u64),
        })
    })())
}

#[cfg(test)]
#[path = "steps_tests.rs"]
mod tests;
