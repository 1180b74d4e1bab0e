// SPDX-License-Identifier: MIT

//! Finding rows with full-text search.
//!
//! The FTS5 index over title/description/tags/category is maintained by
//! triggers, so it moves in the same transaction as the base row. Queries
//! are assembled from conjunctive filter clauses; the project-scope rule
//! (`project_id = ? OR is_global`) has its own entry point.

use cue_core::{ExecutionId, Finding, FindingFilter, FindingId, Severity, StepId};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

use crate::{json, StoreError};

pub fn insert(conn: &Connection, finding: &Finding) -> Result<(), StoreError> {
    conn.prepare_cached(
        "INSERT INTO findings (
            finding_id, execution_id, step_id, severity, category, title,
            description, tags, is_global, project_id, location, metadata, created_at_ms
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )?
    .execute(rusqlite::params![
        finding.finding_id.as_str(),
        finding.execution_id.as_str(),
        finding.step_id.as_ref().map(|s| s.as_str()),
        finding.severity.to_string(),
        finding.category,
        finding.title,
        finding.description,
        json::encode(&finding.tags)?,
        finding.is_global,
        finding.project_id,
        finding.location,
        json::encode_opt(&finding.metadata)?,
        finding.created_at_ms as i64,
    ])?;
    Ok(())
}

pub fn get(conn: &Connection, finding_id: &str) -> Result<Option<Finding>, StoreError> {
    conn.prepare_cached(&select_sql("WHERE finding_id = ?1", None))?
        .query_row([finding_id], from_row)
        .optional()?
        .transpose()
}

/// Conjunctive filter query, newest first.
pub fn query(conn: &Connection, filter: &FindingFilter) -> Result<Vec<Finding>, StoreError> {
    let (clause, params) = build_where(filter, None);
    run_select(conn, &clause, filter.limit, params)
}

/// Project scope: rows for the project plus all global rows.
pub fn for_project(
    conn: &Connection,
    project_id: i64,
    filter: &FindingFilter,
) -> Result<Vec<Finding>, StoreError> {
    let (clause, params) = build_where(filter, Some(project_id));
    run_select(conn, &clause, filter.limit, params)
}

/// Severity histogram under the same filter semantics as [`query`].
pub fn counts_by_severity(
    conn: &Connection,
    filter: &FindingFilter,
    project_scope: Option<i64>,
) -> Result<Vec<(Severity, u32)>, StoreError> {
    let (clause, params) = build_where(filter, project_scope);
    let sql = format!("SELECT severity, COUNT(*) FROM findings {clause} GROUP BY severity");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (text, count) = row?;
        let severity = Severity::parse(&text)
            .ok_or_else(|| StoreError::Encoding(format!("unknown severity '{text}'")))?;
        out.push((severity, count));
    }
    // present in fixed severity order
    out.sort_by_key(|(s, _)| *s);
    Ok(out)
}

fn run_select(
    conn: &Connection,
    clause: &str,
    limit: Option<u32>,
    params: Vec<Value>,
) -> Result<Vec<Finding>, StoreError> {
    let sql = select_sql(clause, limit);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

fn select_sql(clause: &str, limit: Option<u32>) -> String {
    let mut sql = format!(
        "SELECT finding_id, execution_id, step_id, severity, category, title,
                description, tags, is_global, project_id, location, metadata, created_at_ms
         FROM findings {clause} ORDER BY rowid DESC"
    );
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }
    sql
}

// Conjunctive WHERE clause. `project_scope` replaces any project_id filter
// with the scoping rule (project match OR global).
fn build_where(filter: &FindingFilter, project_scope: Option<i64>) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(exe) = &filter.execution_id {
        params.push(Value::Text(exe.as_str().to_string()));
        clauses.push(format!("execution_id = ?{}", params.len()));
    }
    match project_scope {
        Some(project_id) => {
            params.push(Value::Integer(project_id));
            clauses.push(format!("(project_id = ?{} OR is_global = 1)", params.len()));
        }
        None => {
            if let Some(project_id) = filter.project_id {
                params.push(Value::Integer(project_id));
                clauses.push(format!("project_id = ?{}", params.len()));
            }
        }
    }
    if !filter.severities.is_empty() {
        let mut placeholders = Vec::new();
        for severity in &filter.severities {
            params.push(Value::Text(severity.to_string()));
            placeholders.push(format!("?{}", params.len()));
        }
        clauses.push(format!("severity IN ({})", placeholders.join(", ")));
    }
    if let Some(category) = &filter.category {
        params.push(Value::Text(category.clone()));
        clauses.push(format!("category = ?{}", params.len()));
    }
    for tag in &filter.tags {
        // tags are stored as a JSON array; match the quoted element
        params.push(Value::Text(format!("%\"{tag}\"%")));
        clauses.push(format!("tags LIKE ?{}", params.len()));
    }
    if let Some(search) = &filter.search {
        params.push(Value::Text(search.clone()));
        clauses.push(format!(
            "rowid IN (SELECT rowid FROM findings_fts WHERE findings_fts MATCH ?{})",
            params.len()
        ));
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), params)
    }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<Finding, StoreError>> {
    let severity_text: String = row.get(3)?;
    let tags_text: String = row.get(7)?;
    let metadata_text: Option<String> = row.get(11)?;
    Ok((|| {
        let severity = Severity::parse(&severity_text)
            .ok_or_else(|| StoreError::Encoding(format!("unknown severity '{severity_text}'")))?;
        Ok(Finding {
            finding_id: FindingId::from_string(row.get::<_, String>(0)?),
            execution_id: ExecutionId::from_string(row.get::<_, String>(1)?),
            step_id: row.get::<_, Option<String>>(2)?.map(StepId::from_string),
            severity,
            category: row.get(4)?,
            title: row.get(5)?,
            description: row.get(6)?,
            tags: json::decode(&tags_text)?,
            is_global: row.get(8)?,
            project_id: row.get(9)?,
            location: row.get(10)?,
            metadata: json::decode_opt(metadata_text)?,
            created_at_ms: row.get::<_, i64>(12)? as u64,
        })
    })())
}

#[cfg(test)]
#[path = "findings_tests.rs"]
mod tests;
