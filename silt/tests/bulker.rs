use serde_json::Value;
use silt::bulker::Bulker;
use silt::destination::memory::MemoryDestination;
use silt::types::{Action, ActionMeta, DocumentBody};
use silt_config::shared::BulkConfig;
use silt_telemetry::tracing::init_test_tracing;

fn action(id: u32) -> Action {
    let mut body = DocumentBody::new();
    body.insert("title".into(), Value::String(format!("doc-{id}")));
    Action::index(
        ActionMeta {
            index: "river".into(),
            doc_type: "river".into(),
            id: id.to_string(),
            parent: String::new(),
        },
        body,
    )
}

fn config(max_actions: usize, max_bytes: u64) -> BulkConfig {
    BulkConfig {
        max_actions,
        max_bytes,
    }
}

#[tokio::test]
async fn buffers_until_count_threshold() {
    init_test_tracing();

    let destination = MemoryDestination::new();
    let mut bulker = Bulker::new(destination.clone(), config(3, u64::MAX));

    bulker.add(vec![action(1), action(2)]).await.unwrap();
    assert_eq!(bulker.pending_actions(), 2);
    assert!(destination.actions().await.is_empty());

    bulker.add(vec![action(3)]).await.unwrap();
    assert_eq!(bulker.pending_actions(), 0);
    assert_eq!(destination.actions().await.len(), 3);
}

#[tokio::test]
async fn byte_threshold_triggers_submission() {
    init_test_tracing();

    let destination = MemoryDestination::new();
    // Any single document body exceeds one byte.
    let mut bulker = Bulker::new(destination.clone(), config(1000, 1));

    bulker.add(vec![action(1)]).await.unwrap();
    assert_eq!(bulker.pending_actions(), 0);
    assert_eq!(destination.actions().await.len(), 1);
}

#[tokio::test]
async fn explicit_submit_flushes_partial_batches() {
    init_test_tracing();

    let destination = MemoryDestination::new();
    let mut bulker = Bulker::new(destination.clone(), config(100, u64::MAX));

    bulker.add(vec![action(1)]).await.unwrap();
    bulker.submit().await.unwrap();
    assert_eq!(destination.actions().await.len(), 1);

    // Submitting an empty buffer is a successful no-op.
    bulker.submit().await.unwrap();
    assert_eq!(destination.actions().await.len(), 1);
}

#[tokio::test]
async fn stats_track_action_kinds() {
    init_test_tracing();

    let destination = MemoryDestination::new();
    let mut bulker = Bulker::new(destination, config(100, u64::MAX));

    let delete = Action::delete(ActionMeta {
        index: "river".into(),
        doc_type: "river".into(),
        id: "1".into(),
        parent: String::new(),
    });
    let update = Action::update(
        ActionMeta {
            index: "river".into(),
            doc_type: "river".into(),
            id: "2".into(),
            parent: String::new(),
        },
        DocumentBody::new(),
    );
    bulker
        .add(vec![action(1), action(2), update, delete])
        .await
        .unwrap();

    let stats = bulker.stats();
    assert_eq!(stats.index_count, 2);
    assert_eq!(stats.update_count, 1);
    assert_eq!(stats.delete_count, 1);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.item_failures, 0);
}

#[tokio::test]
async fn submission_order_is_preserved() {
    init_test_tracing();

    let destination = MemoryDestination::new();
    let mut bulker = Bulker::new(destination.clone(), config(2, u64::MAX));

    bulker
        .add(vec![action(1), action(2), action(3), action(4)])
        .await
        .unwrap();

    let ids: Vec<String> = destination
        .actions()
        .await
        .iter()
        .map(|a| a.meta().id.clone())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}
