use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use crate::destination::{BulkResponse, Destination};
use crate::error::SiltResult;
use crate::types::{Action, DocumentBody};

/// A document as materialized by the memory destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDocument {
    pub body: DocumentBody,
    pub routing: String,
}

#[derive(Debug, Default)]
struct Inner {
    actions: Vec<Action>,
    documents: HashMap<(String, String), MemoryDocument>,
    indexes: HashMap<String, Value>,
}

/// In-memory destination for testing and development purposes.
///
/// Stores every submitted action and additionally materializes the resulting
/// document state per (index, id), applying index/update/delete semantics in
/// submission order. All data is lost when the process terminates.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    /// Creates a new empty memory destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all actions submitted so far, in submission order.
    pub async fn actions(&self) -> Vec<Action> {
        let inner = self.inner.lock().await;
        inner.actions.clone()
    }

    /// Returns the materialized document state keyed by (index, id).
    pub async fn documents(&self) -> HashMap<(String, String), MemoryDocument> {
        let inner = self.inner.lock().await;
        inner.documents.clone()
    }

    /// Returns the single document for (index, id), if present.
    pub async fn document(&self, index: &str, id: &str) -> Option<MemoryDocument> {
        let inner = self.inner.lock().await;
        inner
            .documents
            .get(&(index.to_string(), id.to_string()))
            .cloned()
    }

    /// Returns the settings of indexes created through this destination.
    pub async fn created_indexes(&self) -> HashMap<String, Value> {
        let inner = self.inner.lock().await;
        inner.indexes.clone()
    }

    /// Pre-declares an index as existing, without settings.
    pub async fn put_existing_index(&self, index: &str) {
        let mut inner = self.inner.lock().await;
        inner.indexes.insert(index.to_string(), Value::Null);
    }

    /// Clears all stored actions and documents.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.actions.clear();
        inner.documents.clear();
        inner.indexes.clear();
    }
}

impl Inner {
    fn apply(&mut self, action: &Action) {
        match action {
            Action::Index { meta, body, .. } => {
                self.documents.insert(
                    (meta.index.clone(), meta.id.clone()),
                    MemoryDocument {
                        body: body.clone(),
                        routing: meta.parent.clone(),
                    },
                );
            }
            Action::Update {
                meta, partial_body, ..
            } => {
                let doc = self
                    .documents
                    .entry((meta.index.clone(), meta.id.clone()))
                    .or_default();
                for (field, value) in partial_body {
                    doc.body.insert(field.clone(), value.clone());
                }
            }
            Action::Delete { meta } => {
                self.documents.remove(&(meta.index.clone(), meta.id.clone()));
            }
        }
    }
}

impl Destination for MemoryDestination {
    fn name() -> &'static str {
        "memory"
    }

    async fn bulk(&self, actions: Vec<Action>) -> SiltResult<BulkResponse> {
        let mut inner = self.inner.lock().await;

        info!("writing a batch of {} actions", actions.len());

        for action in &actions {
            inner.apply(action);
        }
        inner.actions.extend(actions);

        Ok(BulkResponse::default())
    }

    async fn index_exists(&self, index: &str) -> SiltResult<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.indexes.contains_key(index))
    }

    async fn create_index(&self, index: &str, settings: Value) -> SiltResult<()> {
        let mut inner = self.inner.lock().await;
        inner.indexes.insert(index.to_string(), settings);
        Ok(())
    }
}
