// SPDX-License-Identifier: MIT

//! State-machine closure observed end to end.

use crate::prelude::*;
use cue_core::ExecutionState;

#[test]
fn direct_completion_is_rejected_while_a_step_runs() {
    let server = server();
    server.start("e2");

    let err = server
        .ops
        .engine()
        .transition_execution("e2", ExecutionState::Completed, None)
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidTransition");
    assert_eq!(server.status("e2")["state"], "running");
}

#[test]
fn abandoning_a_run_is_terminal_and_closes_the_step() {
    let server = server();
    server.start("e1");

    server
        .ops
        .engine()
        .transition_execution("e1", ExecutionState::Abandoned, Some("operator gave up"))
        .unwrap();

    let status = server.status("e1");
    assert_eq!(status["state"], "abandoned");
    assert!(status["completed_at_ms"].is_number());
    assert!(status["current_step_name"].is_null());
    assert_eq!(status["steps"]["failed"], 1);

    // terminal states have no outgoing edges
    let err = server
        .ops
        .engine()
        .transition_execution("e1", ExecutionState::Running, None)
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidTransition");
}

#[test]
fn paused_runs_refuse_advances_until_terminal_or_resumed() {
    let server = server();
    let t1 = token_of(&server.start("e1"));
    server
        .ops
        .engine()
        .transition_execution("e1", ExecutionState::Paused, Some("hold"))
        .unwrap();

    let kind = server.err(cue_server::protocol::Request::AdvanceStep {
        token: t1,
        output: cue_core::StepOutput::summary("x"),
    });
    assert_eq!(kind, "NotRunnable");
}
