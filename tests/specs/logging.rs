// SPDX-License-Identifier: MIT

//! Idempotent execution logging through the wire.

use crate::prelude::*;
use cue_core::{LogLayer, LogLevel};
use cue_server::protocol::Request;

fn log(server: &Server, layer_id: &str, message: &str) -> serde_json::Value {
    server.ok(Request::LogEvent {
        execution_id: "e1".to_string(),
        layer: LogLayer::Step,
        layer_id: layer_id.to_string(),
        level: LogLevel::Info,
        message: message.to_string(),
        context: None,
        contract_input: None,
        contract_output: None,
    })
}

#[test]
fn duplicate_key_returns_the_first_row() {
    let server = server();
    server.start("e1");

    let first = log(&server, "s1", "A");
    assert_eq!(first["message"], "A");

    let second = log(&server, "s1", "B");
    assert_eq!(second["message"], "A", "stored message must stay A");

    let rows = server.ok(Request::QueryLogs {
        execution_id: "e1".to_string(),
        layer: None,
        level: None,
        limit: None,
    });
    assert_eq!(rows.as_array().unwrap().len(), 1);
}

#[test]
fn distinct_keys_accumulate() {
    let server = server();
    server.start("e1");
    log(&server, "s1", "one");
    log(&server, "s2", "two");

    let rows = server.ok(Request::QueryLogs {
        execution_id: "e1".to_string(),
        layer: Some(LogLayer::Step),
        level: None,
        limit: None,
    });
    assert_eq!(rows.as_array().unwrap().len(), 2);
}

#[test]
fn logging_against_unknown_execution_fails() {
    let server = server();
    let kind = server.err(Request::LogEvent {
        execution_id: "ghost".to_string(),
        layer: LogLayer::Orchestrator,
        layer_id: "x".to_string(),
        level: LogLevel::Warn,
        message: "m".to_string(),
        context: None,
        contract_input: None,
        contract_output: None,
    });
    assert_eq!(kind, "ExecutionNotFound");
}
