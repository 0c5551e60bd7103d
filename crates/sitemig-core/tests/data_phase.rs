//! Data phase against the in-memory platform

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sitemig_core::{ExecutorConfig, MigrationDocument, MigrationError, MigrationExecutor};
use sitemig_gateway::{EntityModel, Method, Permissions};
use sitemig_symbol::SymbolTable;
use sitemig_test_utils::{fixtures, gateway_for, FakePlatform};
use std::sync::Arc;

fn document(value: Value) -> MigrationDocument {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn entities_are_created_and_linked() {
    let platform = Arc::new(FakePlatform::new().with_staff("owner@example.org"));
    let owner = platform.staff_id("owner@example.org").unwrap();
    let symbols = Arc::new(SymbolTable::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), symbols.clone());

    let report = executor.run(&document(fixtures::data_document())).await.unwrap();

    // Existing staff is located, not created
    assert_eq!(symbols.resolve("staff:owner").unwrap(), owner);
    let members = platform.requests_to(Method::Post, "/members");
    assert_eq!(members.len(), 1);
    assert_eq!(
        members[0].body,
        Some(json!({"email": "anna@example.org", "firstName": "Anna"}))
    );

    let anna = symbols.resolve("anna").unwrap();
    assert_eq!(symbols.resolve("staff:anna").unwrap(), anna);

    let clients = platform.entities(EntityModel::Client);
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0].payload.get("caretaker"), Some(&json!(anna)));
    assert!(!clients[1].payload.contains_key("note"));

    let (c1, c2) = (&clients[0].id, &clients[1].id);
    let patches = platform.requests_to(Method::Patch, &format!("/clients/{c1}"));
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].body, Some(json!({"referredBy": c2})));
    assert_eq!(clients[0].payload.get("referredBy"), Some(&json!(c2)));

    let groups = platform.entities(EntityModel::ClientGroup);
    assert_eq!(
        serde_json::Value::Object(groups[0].payload.clone()),
        json!({"name": "Family", "clients": [c1, c2]})
    );

    let meetings = platform.entities(EntityModel::Meeting);
    assert_eq!(
        serde_json::Value::Object(meetings[0].payload.clone()),
        json!({
            "topic": "Intake",
            "staff": [{"id": anna, "attendance": "present"}],
            "clients": [{"id": c1}]
        })
    );

    assert_eq!(report.registered(), 7);
    assert!(symbols.has("meeting:1"));
    assert!(symbols.has("group:family"));
}

#[tokio::test]
async fn metadata_is_overwritten_after_creation() {
    let platform = Arc::new(FakePlatform::new().with_staff("owner@example.org"));
    let owner = platform.staff_id("owner@example.org").unwrap();
    let symbols = Arc::new(SymbolTable::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), symbols.clone());

    executor.run(&document(fixtures::data_document())).await.unwrap();

    let anna = symbols.resolve("staff:anna").unwrap();
    let meeting = symbols.resolve("meeting:1").unwrap();
    assert_eq!(
        platform.metadata(),
        vec![
            json!({"model": "staff", "id": anna, "createdAt": "2020-01-02T03:04:05Z", "createdBy": owner}),
            json!({"model": "meeting", "id": meeting, "updatedBy": anna}),
        ]
    );

    // Each overwrite directly follows the create it belongs to
    let mutations: Vec<_> = platform.mutations().into_iter().map(|r| r.path).collect();
    let create = mutations.iter().position(|p| p.ends_with("/meetings")).unwrap();
    assert!(mutations[create + 1].ends_with("/metadata"));
}

#[tokio::test]
async fn missing_existing_staff_stops_the_run() {
    let platform = Arc::new(FakePlatform::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()));

    let failure = executor.run(&document(fixtures::data_document())).await.unwrap_err();

    assert!(matches!(failure.error, MigrationError::StaffNotFound { ref email } if email == "owner@example.org"));
    assert_eq!(failure.action.subject, "staff:owner");
    assert!(platform.mutations().is_empty());
}

#[tokio::test]
async fn skip_data_stops_after_schema() {
    let platform = Arc::new(FakePlatform::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()))
        .with_config(ExecutorConfig::new().with_skip_data(true));

    let report = executor.run(&document(fixtures::color_document())).await.unwrap();

    assert!(platform.entities(EntityModel::Client).is_empty());
    let phases: Vec<_> = report.phases.iter().map(|p| p.phase).collect();
    assert_eq!(phases, vec!["preseed", "schema"]);
}

#[tokio::test]
async fn permissions_are_checked_per_phase() {
    let platform = Arc::new(FakePlatform::new().with_permissions(Permissions {
        can_manage_schema: true,
        can_manage_data: false,
    }));
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()));

    let err = executor
        .check_permissions(&document(fixtures::data_document()))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Permission(_)));

    let schema_only = document(fixtures::ordering_document());
    assert!(executor.check_permissions(&schema_only).await.is_ok());
    assert!(platform.mutations().is_empty());

    let skipping = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()))
        .with_config(ExecutorConfig::new().with_skip_data(true));
    assert!(skipping.check_permissions(&document(fixtures::data_document())).await.is_ok());
}

#[tokio::test]
async fn record_counts_reflect_target_state() {
    let platform = Arc::new(FakePlatform::new().with_staff("owner@example.org"));
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()));

    executor.run(&document(fixtures::data_document())).await.unwrap();
    let counts = executor.record_counts().await.unwrap();

    assert_eq!(counts.staff, 2);
    assert_eq!(counts.clients, 2);
    assert_eq!(counts.client_groups, 1);
    assert_eq!(counts.meetings, 1);
}
