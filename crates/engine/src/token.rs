// SPDX-License-Identifier: MIT

//! Continuation tokens.
//!
//! A token is a base64url-encoded JSON payload: execution id, step name,
//! RFC 3339 issue time, and a random nonce. It is a bearer credential, not
//! a signature -- replay protection comes from comparing the payload's step
//! against the execution's current step in the store. Validation here is
//! purely structural and temporal and never touches the store.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tokens outlive their step by at most this long.
pub const TOKEN_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// Tolerated forward clock skew for `issued_at`.
pub const CLOCK_SKEW_MS: u64 = 5 * 60 * 1000;

// 22 nanoid chars over a 64-symbol alphabet is ~131 bits of entropy.
const NONCE_LEN: usize = 22;

/// Decoded token contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub execution_id: String,
    pub step_name: String,
    /// RFC 3339 UTC timestamp.
    pub issued_at: String,
    pub nonce: String,
}

impl TokenPayload {
    /// Issue time as epoch milliseconds.
    pub fn issued_at_ms(&self) -> Result<u64, EngineError> {
        let parsed = DateTime::parse_from_rfc3339(&self.issued_at)
            .map_err(|e| EngineError::TokenMalformed(format!("bad issued_at: {e}")))?;
        let ms = parsed.timestamp_millis();
        if ms < 0 {
            return Err(EngineError::TokenMalformed("issued_at before epoch".to_string()));
        }
        Ok(ms as u64)
    }
}

/// Stateless mint/validate service.
#[derive(Debug, Clone, Default)]
pub struct TokenService;

impl TokenService {
    /// Mint a token for one step of one execution.
    pub fn issue(&self, execution_id: &str, step_name: &str, now_ms: u64) -> String {
        let issued_at = DateTime::<Utc>::from_timestamp_millis(now_ms as i64)
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        let payload = TokenPayload {
            execution_id: execution_id.to_string(),
            step_name: step_name.to_string(),
            issued_at,
            nonce: nanoid::nanoid!(NONCE_LEN),
        };
        // serializing a struct of strings cannot fail
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Reverse the encoding without any temporal checks.
    pub fn decode(&self, token: &str) -> Result<TokenPayload, EngineError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|e| EngineError::TokenMalformed(format!("bad encoding: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::TokenMalformed(format!("bad payload: {e}")))
    }

    /// Decode and check the issue time: rejects tokens from the future
    /// (beyond clock skew) and tokens older than the TTL.
    pub fn validate(&self, token: &str, now_ms: u64) -> Result<TokenPayload, EngineError> {
        let payload = self.decode(token)?;
        let issued_ms = payload.issued_at_ms()?;
        if issued_ms > now_ms + CLOCK_SKEW_MS {
            return Err(EngineError::TokenMalformed("issued_at is in the future".to_string()));
        }
        if now_ms.saturating_sub(issued_ms) > TOKEN_TTL_MS {
            return Err(EngineError::TokenExpired);
        }
        Ok(payload)
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
