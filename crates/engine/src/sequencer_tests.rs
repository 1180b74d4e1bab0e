// SPDX-License-Identifier: MIT

use super::*;
use crate::error::EngineError;
use crate::test_util;
use cue_core::test_support;

#[test]
fn start_returns_first_cue_with_token() {
    let engine = test_util::engine();
    let cue = engine
        .start_workflow(StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("w1") })
        .unwrap();

    assert_eq!(cue.execution_id, "e1");
    assert_eq!(cue.step_name, "design");
    assert_eq!(cue.agent_name, "architect");
    assert!(cue.agent_content.contains("architect"));
    assert!(!cue.token.is_empty());

    let status = engine.get_execution_status("e1").unwrap();
    assert_eq!(status.state, ExecutionState::Running);
    assert_eq!(status.current_step_name.as_deref(), Some("design"));
    assert_eq!(status.steps.running, 1);
}

#[test]
fn start_generates_execution_id_when_absent() {
    let engine = test_util::engine();
    let cue = engine.start_workflow(StartRequest::new("w1")).unwrap();
    assert!(cue.execution_id.as_str().starts_with("exe-"));
}

#[test]
fn start_rejects_empty_execution_id() {
    let engine = test_util::engine();
    let err = engine
        .start_workflow(StartRequest {
            execution_id: Some(String::new()),
            ..StartRequest::new("w1")
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArguments(_)));
}

#[test]
fn start_unknown_workflow() {
    let engine = test_util::engine();
    let err = engine.start_workflow(StartRequest::new("ghost")).unwrap_err();
    assert!(matches!(err, EngineError::WorkflowNotFound(name) if name == "ghost"));
}

#[test]
fn start_duplicate_execution_id() {
    let engine = test_util::engine();
    let request = StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("w1") };
    engine.start_workflow(request.clone()).unwrap();
    let err = engine.start_workflow(request).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateExecutionId(id) if id == "e1"));
}

#[test]
fn start_with_missing_agent_writes_no_rows() {
    let engine = test_util::engine();
    engine.register_workflow(&test_support::one_phase("w2", "ghost")).unwrap();

    let request = StartRequest { execution_id: Some("e9".to_string()), ..StartRequest::new("w2") };
    let err = engine.start_workflow(request).unwrap_err();
    assert!(matches!(err, EngineError::AgentNotFound(name) if name == "ghost"));

    let err = engine.get_execution_status("e9").unwrap_err();
    assert!(matches!(err, EngineError::ExecutionNotFound(_)), "no execution row may exist");
}

#[test]
fn start_registers_project_path() {
    let engine = test_util::engine();
    engine
        .start_workflow(StartRequest {
            execution_id: Some("e1".to_string()),
            project_path: Some("/src/acme".to_string()),
            ..StartRequest::new("w1")
        })
        .unwrap();
    let projects = engine.list_projects().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].path, "/src/acme");
    assert_eq!(projects[0].name, "acme");
}

#[test]
fn full_three_phase_run_completes() {
    let engine = test_util::engine();
    let clock = test_util::clock_of(&engine);

    let cue1 = engine
        .start_workflow(StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("w1") })
        .unwrap();
    assert_eq!(cue1.step_name, "design");

    clock.advance_ms(1_000);
    let cue2 = match engine.advance_step(&cue1.token, StepOutput::summary("d")).unwrap() {
        AdvanceOutcome::Next(cue) => cue,
        other => panic!("expected next cue, got {other:?}"),
    };
    assert_eq!(cue2.step_name, "implement");
    assert_eq!(cue2.agent_name, "implementer");

    clock.advance_ms(1_000);
    let cue3 = match engine.advance_step(&cue2.token, StepOutput::summary("i")).unwrap() {
        AdvanceOutcome::Next(cue) => cue,
        other => panic!("expected next cue, got {other:?}"),
    };
    assert_eq!(cue3.step_name, "review");

    clock.advance_ms(1_000);
    match engine.advance_step(&cue3.token, StepOutput::summary("r")).unwrap() {
        AdvanceOutcome::Completed { execution_id } => assert_eq!(execution_id, "e1"),
        other => panic!("expected completion, got {other:?}"),
    }

    let status = engine.get_execution_status("e1").unwrap();
    assert_eq!(status.state, ExecutionState::Completed);
    assert_eq!(status.steps.completed, 3);
    assert_eq!(status.current_step_name, None);
    assert!(status.completed_at_ms.is_some());

    // every step closed, token-free, with durations summing under the run's
    let history = engine.get_step_history("e1").unwrap();
    let step_total: u64 = history.iter().map(|s| s.duration_ms.unwrap_or(0)).sum();
    assert!(history.iter().all(|s| s.status == StepStatus::Completed && s.token.is_none()));
    assert!(step_total <= status.duration_ms.unwrap());
}

#[test]
fn advance_with_reused_token_is_a_mismatch() {
    let engine = test_util::engine();
    let cue1 = engine
        .start_workflow(StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("w1") })
        .unwrap();
    engine.advance_step(&cue1.token, StepOutput::summary("d")).unwrap();

    let before = engine.get_execution_status("e1").unwrap();
    let err = engine.advance_step(&cue1.token, StepOutput::summary("again")).unwrap_err();
    assert!(matches!(err, EngineError::TokenStepMismatch { .. }));

    let after = engine.get_execution_status("e1").unwrap();
    assert_eq!(after, before, "failed advance must not change state");
}

#[test]
fn advance_with_garbage_token_is_malformed() {
    let engine = test_util::engine();
    let err = engine.advance_step("not-a-token", StepOutput::summary("x")).unwrap_err();
    assert!(matches!(err, EngineError::TokenMalformed(_)));
}

#[test]
fn advance_for_unknown_execution() {
    let engine = test_util::engine();
    // mint a structurally valid token for an execution that was never created
    let token = crate::TokenService.issue("never-made", "design", engine.now_ms());
    let err = engine.advance_step(&token, StepOutput::summary("x")).unwrap_err();
    assert!(matches!(err, EngineError::ExecutionNotFound(id) if id == "never-made"));
}

#[test]
fn advance_on_paused_execution_is_not_runnable() {
    let engine = test_util::engine();
    let cue = engine
        .start_workflow(StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("w1") })
        .unwrap();
    engine.transition_execution("e1", ExecutionState::Paused, Some("operator hold")).unwrap();

    let err = engine.advance_step(&cue.token, StepOutput::summary("x")).unwrap_err();
    assert!(matches!(err, EngineError::NotRunnable(ExecutionState::Paused)));
}

#[test]
fn advance_on_terminal_execution_is_already_terminal() {
    let engine = test_util::engine();
    let cue = engine
        .start_workflow(StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("w1") })
        .unwrap();
    engine.transition_execution("e1", ExecutionState::Abandoned, Some("gave up")).unwrap();

    let err = engine.advance_step(&cue.token, StepOutput::summary("x")).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyTerminal(ExecutionState::Abandoned)));
}

#[test]
fn expired_token_is_rejected_regardless_of_state() {
    let engine = test_util::engine();
    let clock = test_util::clock_of(&engine);
    let cue = engine
        .start_workflow(StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("w1") })
        .unwrap();

    clock.advance_ms(crate::TOKEN_TTL_MS + 1);
    let err = engine.advance_step(&cue.token, StepOutput::summary("late")).unwrap_err();
    assert!(matches!(err, EngineError::TokenExpired));

    // the failure was observable in telemetry
    let events = engine.list_telemetry(None, Some("token_expired"), None).unwrap();
    assert_eq!(events.len(), 1);
}

#[test]
fn missing_agent_mid_workflow_fails_the_run() {
    let engine = test_util::engine();
    let mut workflow = test_support::three_phase("w3");
    workflow.phases[1].agent_name = "ghost".to_string();
    engine.register_workflow(&workflow).unwrap();

    let cue = engine
        .start_workflow(StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("w3") })
        .unwrap();
    let err = engine.advance_step(&cue.token, StepOutput::summary("d")).unwrap_err();
    assert!(matches!(err, EngineError::AgentNotFound(name) if name == "ghost"));

    let status = engine.get_execution_status("e1").unwrap();
    assert_eq!(status.state, ExecutionState::Failed, "run must not stall silently");
    assert_eq!(status.steps.completed, 1, "the finished step's work is kept");
}

#[test]
fn diamond_workflow_follows_declared_order() {
    let engine = test_util::engine();
    engine.register_workflow(&test_support::diamond("wd")).unwrap();

    let cue = engine
        .start_workflow(StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("wd") })
        .unwrap();
    assert_eq!(cue.step_name, "root");

    // left and right both become eligible; declared order picks left first
    let cue = match engine.advance_step(&cue.token, StepOutput::summary("r")).unwrap() {
        AdvanceOutcome::Next(cue) => cue,
        other => panic!("{other:?}"),
    };
    assert_eq!(cue.step_name, "left");

    let cue = match engine.advance_step(&cue.token, StepOutput::summary("l")).unwrap() {
        AdvanceOutcome::Next(cue) => cue,
        other => panic!("{other:?}"),
    };
    assert_eq!(cue.step_name, "right");

    // merge needs both left and right; only now is it eligible
    let cue = match engine.advance_step(&cue.token, StepOutput::summary("rt")).unwrap() {
        AdvanceOutcome::Next(cue) => cue,
        other => panic!("{other:?}"),
    };
    assert_eq!(cue.step_name, "merge");

    match engine.advance_step(&cue.token, StepOutput::summary("m")).unwrap() {
        AdvanceOutcome::Completed { .. } => {}
        other => panic!("{other:?}"),
    }
}

#[test]
fn step_output_is_persisted_on_the_completed_step() {
    let engine = test_util::engine();
    let cue = engine
        .start_workflow(StartRequest { execution_id: Some("e1".to_string()), ..StartRequest::new("w1") })
        .unwrap();
    let output = StepOutput {
        summary: "designed the thing".to_string(),
        artifact_ids: vec![cue_core::ArtifactId::from_string("art-1")],
        finding_ids: vec![],
        next_step_hint: Some("implement".to_string()),
    };
    engine.advance_step(&cue.token, output.clone()).unwrap();

    let history = engine.get_step_history("e1").unwrap();
    assert_eq!(history[0].output.as_ref(), Some(&output));
}

#[test]
fn cyclic_workflow_is_rejected_at_start() {
    let engine = test_util::engine();
    // bypass registration validation to simulate a drifted registry entry
    let workflow = cue_core::WorkflowDef {
        name: "wcycle".to_string(),
        description: String::new(),
        phases: vec![
            test_support::phase("start", "architect", &[]),
            test_support::phase("b", "architect", &["c"]),
            test_support::phase("c", "architect", &["b"]),
        ],
        complexity: None,
        triggers: None,
    };
    engine
        .store()
        .with_conn(|conn| cue_store::registry::upsert_workflow(conn, &workflow, 0).map(|_| ()))
        .unwrap();

    let err = engine.start_workflow(StartRequest::new("wcycle")).unwrap_err();
    assert!(matches!(err, EngineError::CyclicDependencies(name) if name == "wcycle"));
}

#[test]
fn empty_phases_rejected_at_start() {
    let engine = test_util::engine();
    let workflow = cue_core::WorkflowDef {
        name: "wempty".to_string(),
        description: String::new(),
        phases: vec![],
        complexity: None,
        triggers: None,
    };
    engine
        .store()
        .with_conn(|conn| cue_store::registry::upsert_workflow(conn, &workflow, 0).map(|_| ()))
        .unwrap();

    let err = engine.start_workflow(StartRequest::new("wempty")).unwrap_err();
    assert!(matches!(err, EngineError::NoPhases(_)));
}

#[test]
fn all_dependent_phases_rejected_with_no_starting_phase() {
    let engine = test_util::engine();
    let workflow = cue_core::WorkflowDef {
        name: "wstuck".to_string(),
        description: String::new(),
        phases: vec![
            test_support::phase("a", "architect", &["b"]),
            test_support::phase("b", "architect", &["a"]),
        ],
        complexity: None,
        triggers: None,
    };
    engine
        .store()
        .with_conn(|conn| cue_store::registry::upsert_workflow(conn, &workflow, 0).map(|_| ()))
        .unwrap();

    let err = engine.start_workflow(StartRequest::new("wstuck")).unwrap_err();
    assert!(matches!(err, EngineError::NoStartingPhase(_)));
}
