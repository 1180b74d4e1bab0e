// SPDX-License-Identifier: MIT

//! Timeout sweep and resumption.

use crate::prelude::*;
use cue_server::protocol::Request;

#[test]
fn overdue_run_times_out_then_resumes_with_a_fresh_token() {
    let server = server();
    let old_token = token_of(&server.start_with("e3", Some(100)));

    server.clock.advance_ms(200);
    let transitioned = server.ok(Request::CheckTimeouts);
    assert_eq!(transitioned, serde_json::json!(["e3"]));
    assert_eq!(server.status("e3")["state"], "timeout");

    // idempotent: nothing newly eligible
    assert_eq!(server.ok(Request::CheckTimeouts), serde_json::json!([]));

    let resumed = server.ok(Request::ResumeExecution { execution_id: "e3".to_string() });
    assert_eq!(resumed["step_name"], "design");
    let fresh = token_of(&resumed);
    assert_ne!(fresh, old_token);
    assert_eq!(server.status("e3")["state"], "running");

    // get_current_step hands out the fresh token
    let current = server.ok(Request::GetCurrentStep { execution_id: "e3".to_string() });
    assert_eq!(current["token"].as_str().unwrap(), fresh);

    // and the run continues from where it stopped
    let frame = server.advance(&fresh, "d");
    assert_eq!(frame["step_name"], "implement");
}

#[test]
fn runs_without_budget_never_time_out() {
    let server = server();
    server.start("eternal");
    server.clock.advance_ms(10_000_000);
    assert_eq!(server.ok(Request::CheckTimeouts), serde_json::json!([]));
    assert_eq!(server.status("eternal")["state"], "running");
}

#[test]
fn resume_requires_a_resumable_state() {
    let server = server();
    server.start("e1");
    let kind = server.err(Request::ResumeExecution { execution_id: "e1".to_string() });
    assert_eq!(kind, "NotResumable");

    let kind = server.err(Request::ResumeExecution { execution_id: "ghost".to_string() });
    assert_eq!(kind, "ExecutionNotFound");
}

#[test]
fn incomplete_list_surfaces_timed_out_runs_for_pickup() {
    let server = server();
    server.start_with("e1", Some(100));
    server.clock.advance_ms(200);
    server.ok(Request::CheckTimeouts);

    let incomplete = server.ok(Request::ListIncomplete);
    let ids: Vec<&str> = incomplete
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["execution_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["e1"]);
}
