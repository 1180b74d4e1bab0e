// SPDX-License-Identifier: MIT

//! Request/response protocol for the stdio transport.
//!
//! Wire format: one JSON object per line. Requests are tagged by `op`,
//! responses by `status` (`ok`/`error`). Error responses carry the stable
//! error kind plus a human-readable message.

mod request;
mod response;

pub use request::Request;
pub use response::{
    ArtifactBody, CompletedBody, CueBody, FindingBody, ProjectContextBody, Response,
    ServerStatusBody, StepSummary,
};

use thiserror::Error;

/// Errors from line framing and parsing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse one request line.
pub fn decode_request(line: &str) -> Result<Request, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

/// Encode one response line (without the trailing newline).
pub fn encode_response(response: &Response) -> String {
    // responses are built from serializable types; failure here is a bug,
    // reported as an error frame rather than a panic
    serde_json::to_string(response).unwrap_or_else(|e| {
        format!(r#"{{"status":"error","kind":"Internal","message":"encode failed: {e}"}}"#)
    })
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
