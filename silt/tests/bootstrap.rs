use serde_json::json;
use silt::bootstrap::create_indexes;
use silt::destination::memory::MemoryDestination;
use silt::rules;
use silt::test_utils::{MemoryCatalog, test_rule_config, test_source, test_table};
use silt_telemetry::tracing::init_test_tracing;
use tempfile::TempDir;

async fn rules_with_index(
    catalog: &MemoryCatalog,
    index: &str,
    index_file: Option<&str>,
) -> std::sync::Arc<rules::RuleSet> {
    catalog.insert(test_table("test", "posts"));
    let sources = [test_source("test", &["posts"])];
    let mut config = test_rule_config("test", "posts", index);
    config.index_file = index_file.map(str::to_string);
    rules::resolve(&sources, &[config], catalog).await.unwrap()
}

#[tokio::test]
async fn creates_index_from_default_settings_file() {
    init_test_tracing();

    let config_dir = TempDir::new().unwrap();
    let settings = json!({ "settings": { "number_of_shards": 1 } });
    std::fs::write(
        config_dir.path().join("river.idx.json"),
        settings.to_string(),
    )
    .unwrap();

    let catalog = MemoryCatalog::new();
    let rules = rules_with_index(&catalog, "river", None).await;
    let destination = MemoryDestination::new();

    create_indexes(config_dir.path(), &rules, &destination)
        .await
        .unwrap();

    let created = destination.created_indexes().await;
    assert_eq!(created["river"], settings);
}

#[tokio::test]
async fn version_suffixed_index_finds_base_settings_file() {
    init_test_tracing();

    let config_dir = TempDir::new().unwrap();
    std::fs::write(config_dir.path().join("river.idx.json"), "{}").unwrap();

    let catalog = MemoryCatalog::new();
    let rules = rules_with_index(&catalog, "river-2", None).await;
    let destination = MemoryDestination::new();

    create_indexes(config_dir.path(), &rules, &destination)
        .await
        .unwrap();

    assert!(destination.created_indexes().await.contains_key("river-2"));
}

#[tokio::test]
async fn missing_default_settings_file_is_skipped() {
    init_test_tracing();

    let config_dir = TempDir::new().unwrap();
    let catalog = MemoryCatalog::new();
    let rules = rules_with_index(&catalog, "river", None).await;
    let destination = MemoryDestination::new();

    create_indexes(config_dir.path(), &rules, &destination)
        .await
        .unwrap();

    assert!(destination.created_indexes().await.is_empty());
}

#[tokio::test]
async fn missing_explicit_settings_file_is_an_error() {
    init_test_tracing();

    let config_dir = TempDir::new().unwrap();
    let catalog = MemoryCatalog::new();
    let rules = rules_with_index(&catalog, "river", Some("custom.idx.json")).await;
    let destination = MemoryDestination::new();

    let result = create_indexes(config_dir.path(), &rules, &destination).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn existing_indexes_are_left_untouched() {
    init_test_tracing();

    let config_dir = TempDir::new().unwrap();
    std::fs::write(
        config_dir.path().join("river.idx.json"),
        json!({ "settings": {} }).to_string(),
    )
    .unwrap();

    let catalog = MemoryCatalog::new();
    let rules = rules_with_index(&catalog, "river", None).await;
    let destination = MemoryDestination::new();
    destination.put_existing_index("river").await;

    create_indexes(config_dir.path(), &rules, &destination)
        .await
        .unwrap();

    // Still only the pre-declared marker, no settings were written.
    assert_eq!(
        destination.created_indexes().await["river"],
        serde_json::Value::Null
    );
}
