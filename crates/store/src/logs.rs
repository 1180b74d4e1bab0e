// SPDX-License-Identifier: MIT

//! Execution log rows, idempotent on `(execution_id, layer, layer_id)`.

use cue_core::{ExecutionId, LogEntry, LogFilter, LogLayer, LogLevel};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{json, StoreError};

/// Insert an entry unless its key already exists; either way, return the row
/// that is in the store afterwards.
pub fn insert_idempotent(conn: &Connection, entry: &LogEntry) -> Result<LogEntry, StoreError> {
    if let Some(existing) =
        get(conn, entry.execution_id.as_str(), entry.layer, &entry.layer_id)?
    {
        return Ok(existing);
    }
    conn.prepare_cached(
        "INSERT INTO execution_logs (
            execution_id, layer, layer_id, log_level, message,
            context, contract_input, contract_output, timestamp_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?
    .execute(params![
        entry.execution_id.as_str(),
        entry.layer.to_string(),
        entry.layer_id,
        entry.level.to_string(),
        entry.message,
        json::encode_opt(&entry.context)?,
        json::encode_opt(&entry.contract_input)?,
        json::encode_opt(&entry.contract_output)?,
        entry.timestamp_ms as i64,
    ])?;
    Ok(entry.clone())
}

pub fn get(
    conn: &Connection,
    execution_id: &str,
    layer: LogLayer,
    layer_id: &str,
) -> Result<Option<LogEntry>, StoreError> {
    conn.prepare_cached(
        "SELECT execution_id, layer, layer_id, log_level, message,
                context, contract_input, contract_output, timestamp_ms
         FROM execution_logs
         WHERE execution_id = ?1 AND layer = ?2 AND layer_id = ?3",
    )?
    .query_row(params![execution_id, layer.to_string(), layer_id], from_row)
    .optional()?
    .transpose()
}

/// Entries for one execution in insert order, with optional layer/level
/// filters and a limit.
pub fn query(
    conn: &Connection,
    execution_id: &str,
    filter: &LogFilter,
) -> Result<Vec<LogEntry>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT execution_id, layer, layer_id, log_level, message,
                context, contract_input, contract_output, timestamp_ms
         FROM execution_logs
         WHERE execution_id = ?1
           AND (?2 IS NULL OR layer = ?2)
           AND (?3 IS NULL OR log_level = ?3)
         ORDER BY id
         LIMIT ?4",
    )?;
    let limit = filter.limit.map(|n| n as i64).unwrap_or(-1);
    let rows = stmt.query_map(
        params![
            execution_id,
            filter.layer.map(|l| l.to_string()),
            filter.level.map(|l| l.to_string()),
            limit
        ],
        from_row,
    )?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

pub fn count_for_execution(conn: &Connection, execution_id: &str) -> Result<u64, StoreError> {
    let count: i64 = conn
        .prepare_cached("SELECT COUNT(*) FROM execution_logs WHERE execution_id = ?1")?
        .query_row([execution_id], |row| row.get(0))?;
    Ok(count as u64)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<LogEntry, StoreError>> {
    let layer_text: String = row.get(1)?;
    let level_text: String = row.get(3)?;
    let context_text: Option<String> = row.get(5)?;
    let input_text: Option<String> = row.get(6)?;
    let output_text: Option<String> = row.get(7)?;
    Ok((|| {
        let layer = LogLayer::parse(&layer_text)
            .ok_or_else(|| StoreError::Encoding(format!("unknown log layer '{layer_text}'")))?;
        let level = LogLevel::parse(&level_text)
            .ok_or_else(|| StoreError::Encoding(format!("unknown log level '{level_text}'")))?;
        Ok(LogEntry {
            execution_id: ExecutionId::from_string(row.get::<_, String>(0)?),
            layer,
            layer_id: row.get(2)?,
            level,
            message: row.get(4)?,
            context: json::decode_opt(context_text)?,
            contract_input: json::decode_opt(input_text)?,
            contract_output: json::decode_opt(output_text)?,
            timestamp_ms: row.get::<_, i64>(8)? as u64,
        })
    })())
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
