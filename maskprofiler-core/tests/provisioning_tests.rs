//! Provisioning pipeline and ensure-or-create contract tests against the
//! in-memory engine.

#![allow(clippy::unwrap_used)]

mod support;

use maskprofiler_core::remote::MaskingApi;
use maskprofiler_core::{MaskProfilerError, ProvisioningPipeline, SchemaScope};
use support::{test_target, FakeEngine, StaticIntrospector};

#[tokio::test]
async fn ensure_application_is_idempotent() {
    let engine = FakeEngine::new();

    let first = engine.ensure_application("MASK_APP").await.unwrap();
    let second = engine.ensure_application("MASK_APP").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.call_count("create_application"), 1);
}

#[tokio::test]
async fn ensure_application_matches_names_case_sensitively() {
    let engine = FakeEngine::new();

    let first = engine.ensure_application("mask_app").await.unwrap();
    let second = engine.ensure_application("MASK_APP").await.unwrap();

    assert_ne!(first, second);
    assert_eq!(engine.call_count("create_application"), 2);
}

#[tokio::test]
async fn ensure_environment_is_idempotent_per_application() {
    let engine = FakeEngine::new();
    let app_id = engine.ensure_application("MASK_APP").await.unwrap();

    let first = engine.ensure_environment(app_id, "MASK_ENV").await.unwrap();
    let second = engine.ensure_environment(app_id, "MASK_ENV").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.call_count("create_environment"), 1);

    // Same name under another application is a distinct environment
    let other_app = engine.ensure_application("OTHER_APP").await.unwrap();
    let third = engine.ensure_environment(other_app, "MASK_ENV").await.unwrap();
    assert_ne!(first, third);
}

#[tokio::test]
async fn empty_table_list_issues_no_bulk_call() {
    let engine = FakeEngine::new();

    engine.sync_ruleset_tables(42, &[]).await.unwrap();

    assert_eq!(engine.call_count("bulk_add_tables"), 0);
}

#[tokio::test]
async fn non_empty_table_list_issues_one_bulk_call() {
    let engine = FakeEngine::new();
    let tables = vec!["EMPLOYEES".to_string(), "SALARIES".to_string()];

    engine.sync_ruleset_tables(42, &tables).await.unwrap();

    assert_eq!(engine.call_count("bulk_add_tables:42:2"), 1);
}

#[tokio::test]
async fn pipeline_provisions_each_discovered_schema() {
    let engine = FakeEngine::new();
    let target = test_target();
    let introspector = StaticIntrospector::new(&["CRM", "SALES"])
        .with_tables("CRM", &["CONTACTS"])
        .with_tables("SALES", &["ORDERS", "INVOICES"]);

    let pipeline = ProvisioningPipeline::new(&engine, &introspector, &target, 7);
    let report = pipeline
        .run("MASK_APP", "MASK_ENV", &SchemaScope::All)
        .await
        .unwrap();

    assert_eq!(report.schemas.len(), 2);
    for outcome in &report.schemas {
        assert!(outcome.error.is_none());
        assert!(outcome.connector_id.is_some());
        assert!(outcome.ruleset_id.is_some());
        assert!(outcome.profile_job_id.is_some());
    }
    assert_eq!(
        engine.ruleset_names(),
        vec!["RULESET_CRM".to_string(), "RULESET_SALES".to_string()]
    );
    assert_eq!(
        engine.job_names(),
        vec!["PROFILEJOB_CRM".to_string(), "PROFILEJOB_SALES".to_string()]
    );
}

#[tokio::test]
async fn pipeline_reuses_existing_connector() {
    let engine = FakeEngine::new();
    let target = test_target();
    let introspector = StaticIntrospector::new(&["CRM"]).with_tables("CRM", &["CONTACTS"]);

    let app_id = engine.ensure_application("MASK_APP").await.unwrap();
    let env_id = engine.ensure_environment(app_id, "MASK_ENV").await.unwrap();
    engine.seed_connector(env_id, 555, "CONNECTOR_CRM");

    let pipeline = ProvisioningPipeline::new(&engine, &introspector, &target, 7);
    let report = pipeline
        .run("MASK_APP", "MASK_ENV", &SchemaScope::All)
        .await
        .unwrap();

    assert_eq!(engine.call_count("create_connector"), 0);
    assert_eq!(report.schemas[0].connector_id, Some(555));
    assert!(report.schemas[0].ruleset_id.is_some());
}

#[tokio::test]
async fn connector_failure_is_isolated_to_its_schema() {
    let engine = FakeEngine::new();
    engine.fail_connector_for("HR");
    let target = test_target();
    let introspector = StaticIntrospector::new(&["CRM", "HR", "SALES"])
        .with_tables("CRM", &["CONTACTS"])
        .with_tables("HR", &["EMPLOYEES"])
        .with_tables("SALES", &["ORDERS"]);

    let pipeline = ProvisioningPipeline::new(&engine, &introspector, &target, 7);
    let report = pipeline
        .run("MASK_APP", "MASK_ENV", &SchemaScope::All)
        .await
        .unwrap();

    // All three schemas were attempted
    assert_eq!(report.schemas.len(), 3);

    let hr = report.schemas.iter().find(|s| s.schema == "HR").unwrap();
    assert!(hr.error.is_some());
    assert!(hr.ruleset_id.is_none());
    assert!(hr.profile_job_id.is_none());

    // No ruleset or job leaked for the failed schema; later schemas succeeded
    assert!(!engine.ruleset_names().contains(&"RULESET_HR".to_string()));
    assert!(!engine.job_names().contains(&"PROFILEJOB_HR".to_string()));
    let sales = report.schemas.iter().find(|s| s.schema == "SALES").unwrap();
    assert!(sales.profile_job_id.is_some());

    assert_eq!(report.failed_schemas().count(), 1);
}

#[tokio::test]
async fn rejected_token_aborts_the_whole_run() {
    let engine = FakeEngine::new();
    engine.fail_connector_auth_for("HR");
    let target = test_target();
    let introspector = StaticIntrospector::new(&["CRM", "HR", "SALES"])
        .with_tables("CRM", &["CONTACTS"])
        .with_tables("HR", &["EMPLOYEES"])
        .with_tables("SALES", &["ORDERS"]);

    let pipeline = ProvisioningPipeline::new(&engine, &introspector, &target, 7);
    let err = pipeline
        .run("MASK_APP", "MASK_ENV", &SchemaScope::All)
        .await
        .unwrap_err();

    assert!(matches!(err, MaskProfilerError::Authentication { .. }));
    // CRM was provisioned before the token was rejected; SALES never was
    assert_eq!(engine.ruleset_names(), vec!["RULESET_CRM".to_string()]);
    assert_eq!(engine.call_count("create_connector:CONNECTOR_SALES"), 0);
}

#[tokio::test]
async fn oracle_single_schema_is_matched_case_insensitively() {
    let engine = FakeEngine::new();
    let target = test_target();
    let introspector = StaticIntrospector::new(&["HR"])
        .with_engine(maskprofiler_core::DatabaseEngine::Oracle)
        .with_tables("HR", &["EMPLOYEES"]);

    let pipeline = ProvisioningPipeline::new(&engine, &introspector, &target, 7);
    let report = pipeline
        .run(
            "MASK_APP",
            "MASK_ENV",
            &SchemaScope::Single("hr".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(report.schemas.len(), 1);
    assert_eq!(report.schemas[0].schema, "HR");
    assert_eq!(engine.ruleset_names(), vec!["RULESET_HR".to_string()]);
}

#[tokio::test]
async fn single_schema_scope_requires_membership() {
    let engine = FakeEngine::new();
    let target = test_target();
    let introspector = StaticIntrospector::new(&["CRM"]);

    let pipeline = ProvisioningPipeline::new(&engine, &introspector, &target, 7);
    let err = pipeline
        .run(
            "MASK_APP",
            "MASK_ENV",
            &SchemaScope::Single("GHOST".to_string()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MaskProfilerError::NotFound { .. }));
    assert_eq!(engine.call_count("create_connector"), 0);
}

#[tokio::test]
async fn single_schema_scope_provisions_only_that_schema() {
    let engine = FakeEngine::new();
    let target = test_target();
    let introspector = StaticIntrospector::new(&["CRM", "SALES"])
        .with_tables("SALES", &["ORDERS"]);

    let pipeline = ProvisioningPipeline::new(&engine, &introspector, &target, 7);
    let report = pipeline
        .run(
            "MASK_APP",
            "MASK_ENV",
            &SchemaScope::Single("SALES".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(report.schemas.len(), 1);
    assert_eq!(report.schemas[0].schema, "SALES");
    assert_eq!(engine.ruleset_names(), vec!["RULESET_SALES".to_string()]);
}

#[tokio::test]
async fn schema_without_tables_skips_bulk_sync() {
    let engine = FakeEngine::new();
    let target = test_target();
    // No tables registered for CRM
    let introspector = StaticIntrospector::new(&["CRM"]);

    let pipeline = ProvisioningPipeline::new(&engine, &introspector, &target, 7);
    let report = pipeline
        .run("MASK_APP", "MASK_ENV", &SchemaScope::All)
        .await
        .unwrap();

    assert_eq!(engine.call_count("bulk_add_tables"), 0);
    assert_eq!(report.schemas[0].table_count, 0);
    // The ruleset and job are still created
    assert!(report.schemas[0].profile_job_id.is_some());
}
