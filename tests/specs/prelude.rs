// SPDX-License-Identifier: MIT

//! Shared setup for the scenario specs.

use cue_core::{AgentPersona, FakeClock};
use cue_engine::Engine;
use cue_server::ops::Ops;
use cue_server::protocol::{Request, Response};
use cue_store::{migrations, Store, StoreOptions};
use tempfile::TempDir;

/// A full server stack over a real database file, on a controllable clock.
pub struct Server {
    pub ops: Ops<FakeClock>,
    pub clock: FakeClock,
    _dir: TempDir,
}

/// Build a server with the standard three-phase registry (`w1`, agents
/// architect/implementer/reviewer).
pub fn server() -> Server {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("app.db");
    let store = Store::open(&db_path, StoreOptions::default()).unwrap();
    migrations::run(&store, &db_path, std::time::Duration::from_secs(5)).unwrap();

    let clock = FakeClock::new();
    let engine = Engine::with_clock(store, clock.clone());
    engine.register_workflow(&cue_core::test_support::three_phase("w1")).unwrap();
    for name in ["architect", "implementer", "reviewer"] {
        engine
            .register_agent(&AgentPersona {
                name: name.to_string(),
                description: format!("{name} persona"),
                content: format!("# {name}\nYou are the {name}."),
            })
            .unwrap();
    }

    Server { ops: Ops::new(engine), clock, _dir: dir }
}

impl Server {
    pub fn ok(&self, request: Request) -> serde_json::Value {
        match self.ops.handle(request) {
            Response::Ok { result } => result,
            Response::Error { kind, message } => panic!("unexpected error {kind}: {message}"),
        }
    }

    pub fn err(&self, request: Request) -> String {
        match self.ops.handle(request) {
            Response::Error { kind, .. } => kind,
            Response::Ok { result } => panic!("unexpected ok: {result}"),
        }
    }

    pub fn start(&self, execution_id: &str) -> serde_json::Value {
        self.start_with(execution_id, None)
    }

    pub fn start_with(&self, execution_id: &str, timeout_ms: Option<u64>) -> serde_json::Value {
        self.ok(Request::StartWorkflow {
            workflow_name: "w1".to_string(),
            execution_id: Some(execution_id.to_string()),
            project_path: None,
            timeout_ms,
            metadata: None,
        })
    }

    pub fn advance(&self, token: &str, summary: &str) -> serde_json::Value {
        self.ok(Request::AdvanceStep {
            token: token.to_string(),
            output: cue_core::StepOutput::summary(summary),
        })
    }

    pub fn status(&self, execution_id: &str) -> serde_json::Value {
        self.ok(Request::GetExecutionStatus { execution_id: execution_id.to_string() })
    }
}

pub fn token_of(frame: &serde_json::Value) -> String {
    frame["token"].as_str().expect("frame carries a token").to_string()
}
