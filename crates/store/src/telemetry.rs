// SPDX-License-Identifier: MIT

//! Append-only telemetry rows.

use cue_core::{ExecutionId, TelemetryEvent};
use rusqlite::{params, Connection, Row};

use crate::{json, StoreError};

pub fn insert(conn: &Connection, event: &TelemetryEvent) -> Result<(), StoreError> {
    conn.prepare_cached(
        "INSERT INTO telemetry_events (
            event_type, execution_id, step_name, agent_name, metadata, created_at_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?
    .execute(params![
        event.event_type,
        event.execution_id.as_ref().map(|e| e.as_str()),
        event.step_name,
        event.agent_name,
        json::encode_opt(&event.metadata)?,
        event.created_at_ms as i64,
    ])?;
    Ok(())
}

/// Newest first, optionally narrowed by execution and/or event type.
/// `limit` is already clamped by the caller.
pub fn query(
    conn: &Connection,
    execution_id: Option<&str>,
    event_type: Option<&str>,
    limit: u32,
) -> Result<Vec<TelemetryEvent>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT event_type, execution_id, step_name, agent_name, metadata, created_at_ms
         FROM telemetry_events
         WHERE (?1 IS NULL OR execution_id = ?1)
           AND (?2 IS NULL OR event_type = ?2)
         ORDER BY id DESC
         LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![execution_id, event_type, limit], from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<TelemetryEvent, StoreError>> {
    let metadata_text: Option<String> = row.get(4)?;
    Ok((|| {
        Ok(TelemetryEvent {
            event_type: row.get(0)?,
            execution_id: row.get::<_, Option<String>>(1)?.map(ExecutionId::from_string),
            step_name: row.get(2)?,
            agent_name: row.get(3)?,
            metadata: json::decode_opt(metadata_text)?,
            created_at_ms: row.get::<_, i64>(5)? as u64,
        })
    })())
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
