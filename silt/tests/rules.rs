use silt::error::ErrorKind;
use silt::rules::resolve;
use silt::test_utils::{MemoryCatalog, test_rule_config, test_source, test_table};
use silt_mysql::{ColumnSchema, ColumnType, TableSchema};
use silt_telemetry::tracing::init_test_tracing;

fn catalog_with(tables: &[&str]) -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    for table in tables {
        catalog.insert(test_table("test", table));
    }
    catalog
}

#[tokio::test]
async fn literal_sources_resolve_to_default_rules() {
    init_test_tracing();

    let catalog = catalog_with(&["posts", "users"]);
    let sources = [test_source("test", &["posts", "users"])];

    let rules = resolve(&sources, &[], &catalog).await.unwrap();

    assert_eq!(rules.len(), 2);
    let rule = rules.get("test", "posts").unwrap();
    assert_eq!(rule.index, "posts");
    assert_eq!(rule.doc_type, "posts");
    assert!(rule.parent.is_none());
    assert_eq!(rule.table_info.single_primary_key(), Some(0));
}

#[tokio::test]
async fn wildcard_expands_against_the_catalog() {
    init_test_tracing();

    let catalog = catalog_with(&["t_0000", "t_0001", "t_0002", "t_0003", "other"]);
    let sources = [test_source("test", &["t_[0-9]{4}"])];
    let overrides = [test_rule_config("test", "t_[0-9]{4}", "shared")];

    let rules = resolve(&sources, &overrides, &catalog).await.unwrap();

    assert_eq!(rules.len(), 4);
    for table in ["t_0000", "t_0001", "t_0002", "t_0003"] {
        let rule = rules.get("test", table).unwrap();
        assert_eq!(rule.index, "shared", "table {table} must share the index");
    }
    assert!(rules.get("test", "other").is_none());
}

#[tokio::test]
async fn literal_override_replaces_the_default_rule() {
    init_test_tracing();

    let catalog = catalog_with(&["posts"]);
    let sources = [test_source("test", &["posts"])];
    let mut config = test_rule_config("test", "posts", "river");
    config.parent = Some("pid".to_string());
    config
        .field_mapping
        .insert("title".to_string(), "es_title".to_string());

    let rules = resolve(&sources, &[config], &catalog).await.unwrap();

    let rule = rules.get("test", "posts").unwrap();
    assert_eq!(rule.index, "river");
    assert_eq!(rule.parent.as_deref(), Some("pid"));
    assert_eq!(rule.field_mapping["title"], "es_title");
}

#[tokio::test]
async fn override_without_source_is_rejected() {
    init_test_tracing();

    let catalog = catalog_with(&["posts"]);
    let sources = [test_source("test", &["posts"])];
    let overrides = [test_rule_config("test", "missing", "river")];

    let err = resolve(&sources, &overrides, &catalog).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::RuleInvalid { .. }));
}

#[tokio::test]
async fn wildcard_override_requires_an_index() {
    init_test_tracing();

    let catalog = catalog_with(&["t_0000"]);
    let sources = [test_source("test", &["t_[0-9]{4}"])];
    let mut config = test_rule_config("test", "t_[0-9]{4}", "");
    config.doc_type = String::new();

    let err = resolve(&sources, &[config], &catalog).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::RuleInvalid { .. }));
}

#[tokio::test]
async fn duplicate_sources_are_rejected() {
    init_test_tracing();

    let catalog = catalog_with(&["posts"]);
    let sources = [test_source("test", &["posts", "posts"])];

    let err = resolve(&sources, &[], &catalog).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::SourceConfigInvalid { .. }));
}

#[tokio::test]
async fn empty_schema_is_rejected() {
    init_test_tracing();

    let catalog = catalog_with(&[]);
    let sources = [test_source("", &["posts"])];

    let err = resolve(&sources, &[], &catalog).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::SourceConfigInvalid { .. }));
}

#[tokio::test]
async fn tables_without_a_single_primary_key_are_rejected() {
    init_test_tracing();

    let catalog = MemoryCatalog::new();
    catalog.insert(TableSchema::new(
        "test",
        "composite",
        vec![
            ColumnSchema::new("a", ColumnType::Integer),
            ColumnSchema::new("b", ColumnType::Integer),
        ],
        vec![0, 1],
    ));
    let sources = [test_source("test", &["composite"])];

    let err = resolve(&sources, &[], &catalog).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::PrimaryKeyInvalid { count: 2, .. }
    ));
}

#[tokio::test]
async fn missing_table_fails_resolution() {
    init_test_tracing();

    let catalog = catalog_with(&[]);
    let sources = [test_source("test", &["ghost"])];

    let err = resolve(&sources, &[], &catalog).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TableNotFound { .. }));
}
