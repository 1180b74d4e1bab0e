// SPDX-License-Identifier: MIT

//! Missing personas: fail fast at start, fail the run mid-workflow.

use crate::prelude::*;
use cue_server::protocol::Request;

#[test]
fn start_with_absent_agent_leaves_no_rows() {
    let server = server();
    server.ok(Request::RegisterWorkflow {
        workflow: cue_core::test_support::one_phase("w2", "ghost"),
    });

    let kind = server.err(Request::StartWorkflow {
        workflow_name: "w2".to_string(),
        execution_id: Some("e9".to_string()),
        project_path: None,
        timeout_ms: None,
        metadata: None,
    });
    assert_eq!(kind, "AgentNotFound");

    let kind = server.err(Request::GetExecutionStatus { execution_id: "e9".to_string() });
    assert_eq!(kind, "ExecutionNotFound");
    assert_eq!(server.ok(Request::ListIncomplete), serde_json::json!([]));
}

#[test]
fn agent_vanishing_mid_workflow_fails_the_run() {
    let server = server();
    let mut workflow = cue_core::test_support::three_phase("w3");
    workflow.phases[2].agent_name = "ghost".to_string();
    server.ok(Request::RegisterWorkflow { workflow });

    let frame = server.ok(Request::StartWorkflow {
        workflow_name: "w3".to_string(),
        execution_id: Some("e1".to_string()),
        project_path: None,
        timeout_ms: None,
        metadata: None,
    });
    let t1 = token_of(&frame);
    let t2 = token_of(&server.advance(&t1, "d"));

    let kind = server.err(Request::AdvanceStep {
        token: t2,
        output: cue_core::StepOutput::summary("i"),
    });
    assert_eq!(kind, "AgentNotFound");
    assert_eq!(server.status("e1")["state"], "failed");
}

#[test]
fn unknown_workflow_is_reported_before_anything_else() {
    let server = server();
    let kind = server.err(Request::StartWorkflow {
        workflow_name: "nope".to_string(),
        execution_id: Some("e1".to_string()),
        project_path: None,
        timeout_ms: None,
        metadata: None,
    });
    assert_eq!(kind, "WorkflowNotFound");
}
