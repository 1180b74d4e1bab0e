// SPDX-License-Identifier: MIT

//! Findings, project scoping, and escalation end to end.

use crate::prelude::*;
use cue_core::Severity;
use cue_server::protocol::Request;

fn store_finding(server: &Server, severity: Severity, title: &str, global: bool) -> serde_json::Value {
    server.ok(Request::StoreFinding {
        execution_id: "e1".to_string(),
        step_id: None,
        severity,
        category: "security".to_string(),
        title: title.to_string(),
        description: format!("details of {title}"),
        tags: vec!["spec".to_string()],
        is_global: global,
        project_path: None,
        location: None,
        metadata: None,
    })
}

#[test]
fn critical_finding_escalates_and_resume_recovers() {
    let server = server();
    server.start("e1");

    let stored = store_finding(&server, Severity::Critical, "rce in parser", false);
    assert_eq!(stored["escalated"], true);
    assert_eq!(server.status("e1")["state"], "escalated");

    let resumed = server.ok(Request::ResumeExecution { execution_id: "e1".to_string() });
    assert_eq!(server.status("e1")["state"], "running");

    // the run continues with the fresh token
    let frame = server.advance(&token_of(&resumed), "patched");
    assert_eq!(frame["step_name"], "implement");
}

#[test]
fn low_findings_accumulate_without_escalating() {
    let server = server();
    server.start("e1");
    for i in 0..10 {
        let stored = store_finding(&server, Severity::Low, &format!("nit {i}"), false);
        assert_eq!(stored["escalated"], false);
    }
    assert_eq!(server.status("e1")["state"], "running");

    let counts = server.ok(Request::FindingCounts { execution_id: Some("e1".to_string()) });
    assert_eq!(counts, serde_json::json!([["low", 10]]));
}

#[test]
fn project_scope_returns_scoped_plus_global_rows() {
    let server = server();
    server.ok(Request::RegisterProject {
        name: "acme".to_string(),
        path: "/src/acme".to_string(),
        is_git_repo: true,
        metadata: None,
    });
    server.ok(Request::StartWorkflow {
        workflow_name: "w1".to_string(),
        execution_id: Some("e1".to_string()),
        project_path: Some("/src/acme".to_string()),
        timeout_ms: None,
        metadata: None,
    });

    store_finding(&server, Severity::Medium, "scoped issue", false);
    store_finding(&server, Severity::Medium, "global issue", true);

    let rows = server.ok(Request::QueryFindings {
        execution_id: None,
        project_path: Some("/src/acme".to_string()),
        severities: vec![],
        category: None,
        tags: vec![],
        search: None,
        limit: None,
    });
    assert_eq!(rows.as_array().unwrap().len(), 2);

    let context = server.ok(Request::GetProjectContext { path: "/src/acme".to_string() });
    assert_eq!(context["project"]["name"], "acme");
    assert_eq!(context["finding_counts"], serde_json::json!([["medium", 2]]));
}

#[test]
fn full_text_search_finds_findings_by_phrase() {
    let server = server();
    server.start("e1");
    store_finding(&server, Severity::High, "sql injection in login", false);
    store_finding(&server, Severity::High, "weak password policy", false);

    let rows = server.ok(Request::QueryFindings {
        execution_id: None,
        project_path: None,
        severities: vec![],
        category: None,
        tags: vec![],
        search: Some("injection".to_string()),
        limit: None,
    });
    let titles: Vec<&str> =
        rows.as_array().unwrap().iter().map(|f| f["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["sql injection in login"]);
}

#[test]
fn artifacts_listed_per_step_with_content_omitted() {
    let server = server();
    server.start("e1");
    server.ok(Request::StoreArtifact {
        execution_id: "e1".to_string(),
        step_name: "design".to_string(),
        artifact_type: cue_core::ArtifactKind::Report,
        name: "design.md".to_string(),
        content: "# the design".to_string(),
        binary: false,
        content_type: Some("text/markdown".to_string()),
        metadata: None,
    });

    let listed = server.ok(Request::ListArtifacts {
        execution_id: "e1".to_string(),
        step_name: Some("design".to_string()),
    });
    let rows = listed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "design.md");
    assert!(rows[0].get("content").is_none(), "listings omit content");
}
