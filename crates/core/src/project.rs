// SPDX-License-Identifier: MIT

//! Project associations used to scope findings.

use serde::{Deserialize, Serialize};

/// A known project root. `name` and `path` are both unique; registering an
/// existing path refreshes `last_used_at` instead of inserting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAssociation {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub is_git_repo: bool,
    pub metadata: Option<serde_json::Value>,
    pub discovered_at_ms: u64,
    pub last_used_at_ms: u64,
}
