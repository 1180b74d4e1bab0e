// SPDX-License-Identifier: MIT

//! Three-phase happy path: design -> implement -> review -> completed.

use crate::prelude::*;
use cue_server::protocol::Request;

#[test]
fn three_phase_run_to_completion() {
    let server = server();

    let frame = server.start("e1");
    assert_eq!(frame["step_name"], "design");
    assert_eq!(frame["agent_name"], "architect");
    assert!(frame["agent_content"].as_str().unwrap().contains("architect"));
    let t1 = token_of(&frame);

    server.clock.advance_ms(500);
    let frame = server.advance(&t1, "d");
    assert_eq!(frame["step_name"], "implement");
    let t2 = token_of(&frame);

    server.clock.advance_ms(500);
    let frame = server.advance(&t2, "i");
    assert_eq!(frame["step_name"], "review");
    let t3 = token_of(&frame);

    server.clock.advance_ms(500);
    let frame = server.advance(&t3, "r");
    assert_eq!(frame["workflow_state"], "completed");
    assert_eq!(frame["execution_id"], "e1");

    let status = server.status("e1");
    assert_eq!(status["state"], "completed");
    assert_eq!(status["steps"]["completed"], 3);
    assert_eq!(status["steps"]["running"], 0);
    assert!(status["current_step_name"].is_null());
    assert_eq!(status["duration_ms"], 1_500);
}

#[test]
fn step_history_shows_the_full_trail() {
    let server = server();
    let t1 = token_of(&server.start("e1"));
    let frame = server.advance(&t1, "designed it");
    let t2 = token_of(&frame);
    server.advance(&t2, "built it");

    let history =
        server.ok(Request::GetStepHistory { execution_id: "e1".to_string() });
    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["step_name"], "design");
    assert_eq!(rows[0]["status"], "completed");
    assert_eq!(rows[0]["summary"], "designed it");
    assert_eq!(rows[2]["step_name"], "review");
    assert_eq!(rows[2]["status"], "running");
}

#[test]
fn telemetry_traces_the_run() {
    let server = server();
    let t1 = token_of(&server.start("e1"));
    server.advance(&t1, "d");

    let events = server.ok(Request::ListTelemetry {
        execution_id: Some("e1".to_string()),
        event_type: None,
        limit: None,
    });
    let types: Vec<&str> =
        events.as_array().unwrap().iter().map(|e| e["event_type"].as_str().unwrap()).collect();
    assert!(types.contains(&"workflow_started"));
    assert!(types.contains(&"step_completed"));
}
