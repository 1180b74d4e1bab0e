// SPDX-License-Identifier: MIT

//! Execution rows.

use cue_core::{Execution, ExecutionId, ExecutionState, StepStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{json, StoreError};

/// Per-status step tallies for one execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StepCounts {
    pub pending: u32,
    pub running: u32,
    pub completed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl StepCounts {
    pub fn total(&self) -> u32 {
        self.pending + self.running + self.completed + self.failed + self.skipped
    }
}

pub fn insert(conn: &Connection, execution: &Execution) -> Result<(), StoreError> {
    conn.prepare_cached(
        "INSERT INTO executions (
            execution_id, workflow_name, state, current_step_name, project_id,
            metadata, timeout_ms, started_at_ms, updated_at_ms, completed_at_ms, duration_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?
    .execute(params![
        execution.execution_id.as_str(),
        execution.workflow_name,
        execution.state.to_string(),
        execution.current_step_name,
        execution.project_id,
        json::encode_opt(&execution.metadata)?,
        execution.timeout_ms.map(|v| v as i64),
        execution.started_at_ms.map(|v| v as i64),
        execution.updated_at_ms as i64,
        execution.completed_at_ms.map(|v| v as i64),
        execution.duration_ms.map(|v| v as i64),
    ])?;
    Ok(())
}

/// Persist the mutable fields of an execution row.
pub fn update(conn: &Connection, execution: &Execution) -> Result<(), StoreError> {
    conn.prepare_cached(
        "UPDATE executions SET
            state = ?2, current_step_name = ?3, metadata = ?4, timeout_ms = ?5,
            started_at_ms = ?6, updated_at_ms = ?7, completed_at_ms = ?8, duration_ms = ?9
         WHERE execution_id = ?1",
    )?
    .execute(params![
        execution.execution_id.as_str(),
        execution.state.to_string(),
        execution.current_step_name,
        json::encode_opt(&execution.metadata)?,
        execution.timeout_ms.map(|v| v as i64),
        execution.started_at_ms.map(|v| v as i64),
        execution.updated_at_ms as i64,
        execution.completed_at_ms.map(|v| v as i64),
        execution.duration_ms.map(|v| v as i64),
    ])?;
    Ok(())
}

pub fn get(conn: &Connection, execution_id: &str) -> Result<Option<Execution>, StoreError> {
    conn.prepare_cached(
        "SELECT execution_id, workflow_name, state, current_step_name, project_id,
                metadata, timeout_ms, started_at_ms, updated_at_ms, completed_at_ms, duration_ms
         FROM executions WHERE execution_id = ?1",
    )?
    .query_row([execution_id], from_row)
    .optional()?
    .transpose()
}

pub fn exists(conn: &Connection, execution_id: &str) -> Result<bool, StoreError> {
    let found: bool = conn
        .prepare_cached("SELECT EXISTS (SELECT 1 FROM executions WHERE execution_id = ?1)")?
        .query_row([execution_id], |row| row.get(0))?;
    Ok(found)
}

/// Executions not yet in a terminal state, oldest first.
pub fn list_incomplete(conn: &Connection) -> Result<Vec<Execution>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT execution_id, workflow_name, state, current_step_name, project_id,
                metadata, timeout_ms, started_at_ms, updated_at_ms, completed_at_ms, duration_ms
         FROM executions
         WHERE state NOT IN ('completed', 'failed', 'abandoned', 'diverged')
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], from_row)?;
    collect(rows)
}

/// Running executions with a timeout budget -- the sweep's candidate set.
pub fn list_running_with_timeout(conn: &Connection) -> Result<Vec<Execution>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT execution_id, workflow_name, state, current_step_name, project_id,
                metadata, timeout_ms, started_at_ms, updated_at_ms, completed_at_ms, duration_ms
         FROM executions
         WHERE state = 'running' AND timeout_ms IS NOT NULL
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], from_row)?;
    collect(rows)
}

pub fn step_counts(conn: &Connection, execution_id: &str) -> Result<StepCounts, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT status, COUNT(*) FROM steps WHERE execution_id = ?1 GROUP BY status",
    )?;
    let mut counts = StepCounts::default();
    let rows = stmt.query_map([execution_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
    })?;
    for row in rows {
        let (status, count) = row?;
        match StepStatus::parse(&status) {
            Some(StepStatus::Pending) => counts.pending = count,
            Some(StepStatus::Running) => counts.running = count,
            Some(StepStatus::Completed) => counts.completed = count,
            Some(StepStatus::Failed) => counts.failed = count,
            Some(StepStatus::Skipped) => counts.skipped = count,
            None => return Err(StoreError::Encoding(format!("unknown step status '{status}'"))),
        }
    }
    Ok(counts)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<Execution, StoreError>> {
    let state_text: String = row.get(2)?;
    let metadata_text: Option<String> = row.get(5)?;
    Ok((|| {
        let state = ExecutionState::parse(&state_text)
            .ok_or_else(|| StoreError::Encoding(format!("unknown execution state '{state_text}'")))?;
        Ok(Execution {
            execution_id: ExecutionId::from_string(row.get::<_, String>(0)?),
            workflow_name: row.get(1)?,
            state,
            current_step_name: row.get(3)?,
            project_id: row.get(4)?,
            metadata: json::decode_opt(metadata_text)?,
            timeout_ms: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
            started_at_ms: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
            updated_at_ms: row.get::<_, i64>(8)? as u64,
            completed_at_ms: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
            duration_ms: row.get::<_, Option<i64>>(10)?.map(|v| v as u64),
        })
    })())
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<Result<Execution, StoreError>>>,
) -> Result<Vec<Execution>, StoreError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "executions_tests.rs"]
mod tests;
