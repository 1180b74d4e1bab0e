// SPDX-License-Identifier: MIT

//! Agent personas delivered verbatim to callers.

use serde::{Deserialize, Serialize};

/// A named persona: the markdown a caller assumes while doing a step's work.
/// Read-only input from the content registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPersona {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Opaque markdown blob; the engine never parses it.
    pub content: String,
}
