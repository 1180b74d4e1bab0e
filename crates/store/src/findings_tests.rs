// SPDX-License-Identifier: MIT

use super::*;
use crate::test_util;

fn finding(id: &str, severity: Severity) -> Finding {
    Finding {
        finding_id: FindingId::from_string(id),
        execution_id: ExecutionId::from_string("e1"),
        step_id: None,
        severity,
        category: "security".to_string(),
        title: format!("finding {id}"),
        description: "a plain description".to_string(),
        tags: vec![],
        is_global: false,
        project_id: None,
        location: None,
        metadata: None,
        created_at_ms: 1_000,
    }
}

fn seed(store: &crate::Store, f: &Finding) {
    store.with_conn(|conn| insert(conn, f)).unwrap();
}

#[test]
fn insert_get_round_trip() {
    let store = test_util::store();
    test_util::seed_execution(&store, "e1");
    let mut f = finding("fnd-1", Severity::High);
    f.tags = vec!["auth".to_string(), "sql".to_string()];
    f.metadata = Some(serde_json::json!({"blocking": true}));
    seed(&store, &f);

    let loaded = store.with_conn(|conn| get(conn, "fnd-1")).unwrap().unwrap();
    assert_eq!(loaded, f);
}

#[test]
fn query_filters_by_severity_set_and_category() {
    let store = test_util::store();
    test_util::seed_execution(&store, "e1");
    seed(&store, &finding("fnd-info", Severity::Info));
    seed(&store, &finding("fnd-high", Severity::High));
    seed(&store, &finding("fnd-crit", Severity::Critical));

    let filter = FindingFilter {
        severities: vec![Severity::High, Severity::Critical],
        category: Some("security".to_string()),
        ..FindingFilter::default()
    };
    let rows = store.with_conn(|conn| query(conn, &filter)).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|f| f.severity >= Severity::High));
}

#[test]
fn query_filters_by_tag() {
    let store = test_util::store();
    test_util::seed_execution(&store, "e1");
    let mut tagged = finding("fnd-tagged", Severity::Low);
    tagged.tags = vec!["injection".to_string()];
    seed(&store, &tagged);
    seed(&store, &finding("fnd-plain", Severity::Low));

    let filter = FindingFilter { tags: vec!["injection".to_string()], ..FindingFilter::default() };
    let rows = store.with_conn(|conn| query(conn, &filter)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].finding_id, "fnd-tagged");
}

#[test]
fn full_text_search_matches_title_and_description() {
    let store = test_util::store();
    test_util::seed_execution(&store, "e1");
    let mut f = finding("fnd-sqli", Severity::High);
    f.title = "SQL injection in login form".to_string();
    f.description = "parameter echoed into the query".to_string();
    seed(&store, &f);
    seed(&store, &finding("fnd-other", Severity::High));

    let filter =
        FindingFilter { search: Some("injection".to_string()), ..FindingFilter::default() };
    let rows = store.with_conn(|conn| query(conn, &filter)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].finding_id, "fnd-sqli");
}

#[test]
fn project_scope_includes_global_rows() {
    let store = test_util::store();
    test_util::seed_execution(&store, "e1");
    let mut scoped = finding("fnd-scoped", Severity::Medium);
    scoped.project_id = Some(7);
    seed(&store, &scoped);
    let mut global = finding("fnd-global", Severity::Medium);
    global.is_global = true;
    seed(&store, &global);
    let mut other = finding("fnd-other", Severity::Medium);
    other.project_id = Some(8);
    seed(&store, &other);

    let rows = store
        .with_conn(|conn| for_project(conn, 7, &FindingFilter::default()))
        .unwrap();
    let ids: Vec<&str> = rows.iter().map(|f| f.finding_id.as_str()).collect();
    assert_eq!(rows.len(), 2);
    assert!(ids.contains(&"fnd-scoped") && ids.contains(&"fnd-global"));
}

#[test]
fn counts_by_severity_aggregates() {
    let store = test_util::store();
    test_util::seed_execution(&store, "e1");
    seed(&store, &finding("f1", Severity::High));
    seed(&store, &finding("f2", Severity::High));
    seed(&store, &finding("f3", Severity::Critical));

    let counts = store
        .with_conn(|conn| counts_by_severity(conn, &FindingFilter::default(), None))
        .unwrap();
    assert_eq!(counts, vec![(Severity::High, 2), (Severity::Critical, 1)]);
}

#[test]
fn query_returns_newest_first_and_respects_limit() {
    let store = test_util::store();
    test_util::seed_execution(&store, "e1");
    for i in 0..5 {
        seed(&store, &finding(&format!("fnd-{i}"), Severity::Low));
    }
    let filter = FindingFilter { limit: Some(2), ..FindingFilter::default() };
    let rows = store.with_conn(|conn| query(conn, &filter)).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].finding_id, "fnd-4");
    assert_eq!(rows[1].finding_id, "fnd-3");
}
