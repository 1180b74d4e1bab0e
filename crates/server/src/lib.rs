// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cue-server: the transport-facing surface of the cue engine.
//!
//! The binary (`cued`) speaks newline-delimited JSON over stdio: one request
//! per line in, one response per line out, in order. A background sweep task
//! forces timed-out executions into `timeout` on a fixed cadence. MCP (or
//! any other) framing lives in an external adapter that maps its tool calls
//! onto [`protocol::Request`].

pub mod env;
pub mod listener;
pub mod ops;
pub mod protocol;
pub mod startup;
pub mod sweep;

pub use env::Config;
pub use ops::Ops;
pub use startup::{startup, StartupError};
