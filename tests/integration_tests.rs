//! Integration tests for the complete Casefile pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Case catalog → Session → Query
//! - Session → Schema reflection → Layout → DOT/JSON rendering
//! - Answer submission → Progress ledger on disk
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;
use tempfile::tempdir;

use casefile_catalog::{CaseCatalog, CategoryId};
use casefile_engine::{
    EngineBootstrap, LoadOutcome, SessionError, SqliteLoader, SqliteOptions, Value, Workbench,
};
use casefile_progress::{submit_answer, AwardOutcome, JsonFileLedger, ProgressLedger};

fn workbench(catalog: CaseCatalog) -> Workbench {
    let bootstrap = Arc::new(EngineBootstrap::new(Arc::new(SqliteLoader::default())));
    Workbench::new(bootstrap, Arc::new(catalog))
}

// ============================================================================
// Catalog → Session → Query
// ============================================================================

#[tokio::test]
async fn test_every_builtin_case_loads_and_reflects() {
    let catalog = CaseCatalog::builtin().unwrap();
    let ids = catalog.ids();
    let bench = workbench(catalog);

    for id in &ids {
        assert_eq!(
            bench.sessions.load_schema(id).await.unwrap(),
            LoadOutcome::Loaded,
            "case {id}"
        );
        let graph = bench.reflector.reflect().unwrap();
        assert!(!graph.tables.is_empty(), "case {id} has no tables");
        assert!(!graph.edges.is_empty(), "case {id} has no foreign keys");
        assert!(graph.is_consistent(), "case {id} graph is inconsistent");
    }
}

#[tokio::test]
async fn test_case_001_investigation() {
    let bench = workbench(CaseCatalog::builtin().unwrap());
    bench.sessions.load_schema("case-001").await.unwrap();

    let scene = bench
        .executor
        .run("SELECT location FROM crime_scene WHERE type = 'theft'")
        .unwrap();
    assert_eq!(scene.rows, vec![vec![Value::from("Blue Note Lounge")]]);

    let culprit = bench
        .executor
        .run(
            "SELECT s.name FROM suspects s \
             JOIN interviews i ON i.suspect_id = s.id \
             WHERE s.attire = 'trench coat' AND s.scar = 'left cheek'",
        )
        .unwrap();
    assert_eq!(culprit.columns, vec!["name".to_string()]);
    assert_eq!(culprit.rows, vec![vec![Value::from("Vincent Malone")]]);
}

#[tokio::test]
async fn test_engine_errors_reach_the_player_verbatim() {
    let bench = workbench(CaseCatalog::builtin().unwrap());
    bench.sessions.load_schema("case-001").await.unwrap();

    let err = bench
        .executor
        .run("SELECT * FROM nonexistent_table")
        .unwrap_err();
    assert!(err.is_user_facing());
    assert_eq!(err.to_string(), "no such table: nonexistent_table");
}

#[tokio::test]
async fn test_rapid_case_switch_keeps_the_last_request() {
    let bench = workbench(CaseCatalog::builtin().unwrap());

    let (first, second) = tokio::join!(
        bench.sessions.load_schema("case-001"),
        bench.sessions.load_schema("case-002")
    );
    assert_eq!(first.unwrap(), LoadOutcome::Superseded);
    assert_eq!(second.unwrap(), LoadOutcome::Loaded);

    assert_eq!(bench.sessions.active_puzzle().as_deref(), Some("case-002"));
    let graph = bench.reflector.reflect().unwrap();
    assert_eq!(graph.table_names(), vec!["customers", "orders"]);
    assert!(matches!(
        bench.executor.run("SELECT * FROM suspects"),
        Err(SessionError::Query { .. })
    ));
}

#[tokio::test]
async fn test_global_bootstrap_is_shared() {
    let a = EngineBootstrap::global();
    let b = EngineBootstrap::global();
    assert!(Arc::ptr_eq(&a, &b));

    let bench = Workbench::with_global_engine(Arc::new(CaseCatalog::builtin().unwrap()));
    bench.sessions.load_schema("case-003").await.unwrap();
    assert!(a.get().is_some());
}

// ============================================================================
// Session → Reflection → Rendering
// ============================================================================

#[tokio::test]
async fn test_schema_render_pipeline() {
    let bench = workbench(CaseCatalog::builtin().unwrap());
    bench.sessions.load_schema("case-003").await.unwrap();

    let (graph, positions) = bench.reflector.reflect_with_layout().unwrap();
    assert_eq!(positions.len(), graph.tables.len());
    assert_eq!(graph.edges.len(), 3);

    let dot = casefile_schema::render_dot(&graph, &positions);
    assert!(dot.starts_with("digraph casefile"));
    assert!(dot.contains("evidence"));

    let json: serde_json::Value =
        serde_json::from_str(&casefile_schema::render_json(&graph, &positions).unwrap()).unwrap();
    assert_eq!(json["tables"].as_array().unwrap().len(), 4);
    assert_eq!(json["edges"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_foreign_key_enforcement_option() {
    let loader = SqliteLoader::new(SqliteOptions {
        foreign_keys: true,
        ..Default::default()
    });
    let bootstrap = Arc::new(EngineBootstrap::new(Arc::new(loader)));
    let bench = Workbench::new(bootstrap, Arc::new(CaseCatalog::builtin().unwrap()));
    bench.sessions.load_schema("case-002").await.unwrap();

    let err = bench
        .executor
        .run("INSERT INTO orders (order_id, customer_id) VALUES (999, 'NOBODY')")
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY constraint failed"));
}

// ============================================================================
// Custom catalogs and progress
// ============================================================================

const CUSTOM_CASE: &str = r#"{
  "id": "case-900",
  "title": "The Locked Room",
  "difficulty": 2,
  "description": "Nobody entered, nobody left.",
  "xp_reward": 120,
  "category": "intermediate",
  "brief": "Check the door log.",
  "solution": {
    "answer": "Night Porter",
    "success_message": "The porter had the only key.",
    "explanation": "Only one badge opened the door after midnight."
  },
  "schema": [
    "CREATE TABLE staff (id INTEGER PRIMARY KEY, role TEXT);",
    "CREATE TABLE door_log (staff_id INTEGER REFERENCES staff, at TEXT);",
    "INSERT INTO staff VALUES (1, 'Night Porter'), (2, 'Chef');",
    "INSERT INTO door_log VALUES (1, '00:40');"
  ]
}"#;

#[tokio::test]
async fn test_custom_catalog_solve_and_persist() {
    let dir = tempdir().unwrap();
    let cases_dir = dir.path().join("cases");
    std::fs::create_dir_all(&cases_dir).unwrap();
    std::fs::write(cases_dir.join("case-900.json"), CUSTOM_CASE).unwrap();

    let catalog = CaseCatalog::from_dir(&cases_dir).unwrap();
    let case = catalog.get("case-900").unwrap().clone();
    assert_eq!(case.category, CategoryId::Intermediate);
    assert!(case.objectives.is_empty());
    let bench = workbench(catalog);

    bench.sessions.load_schema("case-900").await.unwrap();
    let graph = bench.reflector.reflect().unwrap();
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].to_column, "id");

    let suspect = bench
        .executor
        .run("SELECT s.role FROM door_log d JOIN staff s ON s.id = d.staff_id")
        .unwrap();
    let Value::Text(answer) = &suspect.rows[0][0] else {
        panic!("expected text, got {:?}", suspect.rows[0][0]);
    };

    let ledger = JsonFileLedger::new(dir.path().join("progress.json"));
    let submission = submit_answer(&case, answer, Some("det-1"), &ledger)
        .await
        .unwrap();
    assert!(submission.correct);
    assert_eq!(submission.award, Some(AwardOutcome::Awarded { xp: 120 }));

    let repeat = submit_answer(&case, answer, Some("det-1"), &ledger)
        .await
        .unwrap();
    assert_eq!(repeat.award, None);

    let reopened = JsonFileLedger::new(dir.path().join("progress.json"));
    let progress = reopened.progress("det-1").await.unwrap();
    assert_eq!(progress.xp, 120);
    assert!(progress.has_completed("case-900"));
}
