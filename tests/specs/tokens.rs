// SPDX-License-Identifier: MIT

//! Token single-use and expiry behavior.

use crate::prelude::*;
use cue_server::protocol::Request;

#[test]
fn reused_token_fails_without_touching_state() {
    let server = server();
    let t1 = token_of(&server.start("e1"));
    server.advance(&t1, "d");

    let before = server.status("e1");
    let kind = server.err(Request::AdvanceStep {
        token: t1,
        output: cue_core::StepOutput::summary("again"),
    });
    assert_eq!(kind, "TokenStepMismatch");
    assert_eq!(server.status("e1"), before);
}

#[test]
fn expired_token_is_rejected_even_on_a_running_execution() {
    let server = server();
    let t1 = token_of(&server.start("e1"));

    server.clock.advance_ms(cue_engine::TOKEN_TTL_MS + 1);
    let kind = server.err(Request::AdvanceStep {
        token: t1,
        output: cue_core::StepOutput::summary("too late"),
    });
    assert_eq!(kind, "TokenExpired");
    assert_eq!(server.status("e1")["state"], "running");
}

#[test]
fn malformed_tokens_are_rejected_structurally() {
    let server = server();
    for bad in ["", "zzz", "eyJub3QiOiJvdXJzIn0"] {
        let kind = server.err(Request::AdvanceStep {
            token: bad.to_string(),
            output: cue_core::StepOutput::summary("x"),
        });
        assert_eq!(kind, "TokenMalformed", "{bad:?}");
    }
}

#[test]
fn current_step_always_returns_the_live_token() {
    let server = server();
    let t1 = token_of(&server.start("e1"));

    let current = server.ok(Request::GetCurrentStep { execution_id: "e1".to_string() });
    assert_eq!(current["token"].as_str().unwrap(), t1);
    assert_eq!(current["step_name"], "design");
    assert_eq!(current["progress"]["running"], 1);
    assert!(current["instructions"].as_str().unwrap().contains("advance_step"));
}
