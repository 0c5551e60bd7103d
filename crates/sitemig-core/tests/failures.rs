//! Halting behaviour: reference errors, remote errors, retry exhaustion

use serde_json::{json, Value};
use sitemig_core::{ActionState, MigrationDocument, MigrationError, MigrationExecutor};
use sitemig_gateway::{EntityModel, GatewayError, Method};
use sitemig_symbol::{AuditLog, SymbolError, SymbolTable};
use sitemig_test_utils::{fixtures, gateway_for, FakePlatform};
use std::sync::Arc;

fn document(value: Value) -> MigrationDocument {
    serde_json::from_value(value).unwrap()
}

fn three_clients_second_broken() -> MigrationDocument {
    document(json!({
        "clients": [
            {"nn": "c1", "fields": {"name": "A"}},
            {"nn": "c2", "fields": {"friend": {"ref": "nobody"}}},
            {"nn": "c3", "fields": {"friend": {"ref": "c1"}}}
        ]
    }))
}

#[tokio::test]
async fn unresolved_reference_halts_before_later_actions() {
    let platform = Arc::new(FakePlatform::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()));

    let failure = executor.run(&three_clients_second_broken()).await.unwrap_err();

    assert_eq!(
        failure.error.to_string(),
        "symbol error: unresolved reference 'nobody'"
    );
    assert!(failure.error.is_reference_error());
    assert_eq!(failure.action.subject, "c2");
    assert_eq!(platform.entities(EntityModel::Client).len(), 1);

    let states: Vec<_> = failure
        .report
        .actions
        .iter()
        .map(|a| (a.label.subject.as_str(), a.state))
        .collect();
    assert_eq!(states, vec![("c1", ActionState::Registered), ("c2", ActionState::Failed)]);
    assert_eq!(failure.report.symbols, 1);
}

#[tokio::test]
async fn duplicate_alias_with_new_identity_is_fatal() {
    let platform = Arc::new(FakePlatform::new());
    let symbols = Arc::new(SymbolTable::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), symbols.clone());

    let failure = executor
        .run(&document(json!({
            "clients": [{"nn": "c1"}, {"nn": ["c9", "c1"]}]
        })))
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        MigrationError::Symbol(SymbolError::DuplicateKey { ref alias, .. }) if alias == "c1"
    ));
    // Nothing from the failed define was bound
    assert!(!symbols.has("c9"));
    assert_eq!(failure.report.actions.last().unwrap().state, ActionState::Failed);
}

#[tokio::test]
async fn transient_failures_within_budget_are_absorbed() {
    let platform = Arc::new(FakePlatform::new());
    platform.fail_transient(4);
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()));

    let report = executor.run(&document(fixtures::color_document())).await.unwrap();

    assert_eq!(report.registered(), 3);
    assert_eq!(platform.requests_to(Method::Post, "/dictionaries").len(), 5);
    assert_eq!(platform.dictionaries().len(), 1);
}

#[tokio::test]
async fn exhausted_retry_budget_halts_the_run() {
    let platform = Arc::new(FakePlatform::new());
    platform.fail_transient(5);
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()));

    let failure = executor.run(&document(fixtures::color_document())).await.unwrap_err();

    assert!(failure.error.is_transient());
    assert!(matches!(
        failure.error,
        MigrationError::Gateway(GatewayError::TransientExhausted { attempts: 5, .. })
    ));
    // No sixth attempt and nothing after the failing action
    assert_eq!(platform.requests().len(), 5);
    assert!(platform.dictionaries().is_empty());
    assert_eq!(failure.action.kind, "createDictionary");
    assert_eq!(failure.report.actions.len(), 1);
}

#[tokio::test]
async fn application_errors_are_not_retried() {
    let platform = Arc::new(FakePlatform::new());
    platform.reject("/attributes", "field name taken");
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()));

    let failure = executor.run(&document(fixtures::color_document())).await.unwrap_err();

    match &failure.error {
        MigrationError::Gateway(GatewayError::RemoteApplication { errors, .. }) => {
            assert_eq!(errors[0].message, "field name taken");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(platform.requests_to(Method::Post, "/attributes").len(), 1);
    // Already-created entities stay created
    assert_eq!(platform.dictionaries().len(), 1);
    assert!(platform.entities(EntityModel::Client).is_empty());
}

#[tokio::test]
async fn audit_log_lists_exactly_what_was_registered() {
    let dir = tempfile::tempdir().unwrap();
    let audit = AuditLog::create_in(dir.path()).unwrap();
    let path = audit.path().to_path_buf();
    let symbols = Arc::new(SymbolTable::with_audit(audit));
    let platform = Arc::new(FakePlatform::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), symbols);

    let failure = executor.run(&three_clients_second_broken()).await.unwrap_err();
    assert_eq!(failure.action.subject, "c2");

    let contents = std::fs::read_to_string(path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    let c1 = &platform.entities(EntityModel::Client)[0].id;
    assert_eq!(lines[0], format!("c1\t{c1}\tclient"));
}

#[tokio::test]
async fn failure_after_create_keeps_the_remote_id() {
    let platform = Arc::new(FakePlatform::new());
    platform.reject("/metadata", "metadata locked");
    let symbols = Arc::new(SymbolTable::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), symbols.clone());

    let failure = executor
        .run(&document(json!({
            "clients": [{"nn": "c1", "fields": {"name": "A"}, "meta": {"createdAt": "2021-05-06T07:08:09Z"}}]
        })))
        .await
        .unwrap_err();

    let created = symbols.resolve("c1").unwrap();
    assert_eq!(platform.entities(EntityModel::Client)[0].id, created);
    let record = failure.report.action("c1").unwrap();
    assert_eq!(record.state, ActionState::Failed);
    assert_eq!(record.id, Some(created));
}

#[tokio::test]
async fn failure_before_submission_has_no_id() {
    let platform = Arc::new(FakePlatform::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()));

    let failure = executor.run(&three_clients_second_broken()).await.unwrap_err();

    assert_eq!(failure.report.action("c2").unwrap().id, None);
    assert!(failure.report.action("c1").unwrap().id.is_some());
}

#[tokio::test]
async fn blank_preseed_alias_is_rejected() {
    let platform = Arc::new(FakePlatform::new());
    let symbols = Arc::new(SymbolTable::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), symbols.clone());

    let failure = executor
        .run(&document(json!({
            "preseed": [{"alias": "", "id": "d-1", "kind": "dictionary"}]
        })))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, MigrationError::Symbol(SymbolError::EmptyAliases)));
    assert!(symbols.is_empty());
    assert!(platform.requests().is_empty());
}

#[tokio::test]
async fn generated_field_declared_twice_is_fatal() {
    let platform = Arc::new(FakePlatform::new());
    let executor = MigrationExecutor::new(gateway_for(&platform), Arc::new(SymbolTable::new()));

    let attribute = json!({"kind": "createAttribute", "model": "client", "name": "Tag", "field": "tag$", "type": "text"});
    let failure = executor
        .run(&document(json!({ "schema": [attribute.clone(), attribute] })))
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        MigrationError::Symbol(SymbolError::DuplicateGeneratedName { ref declared, .. }) if declared == "tag$"
    ));
    assert_eq!(platform.requests_to(Method::Post, "/attributes").len(), 1);
}
