use std::future::Future;

use serde_json::Value;

use crate::error::SiltResult;
use crate::types::Action;

/// Failure of a single action inside an otherwise successful bulk request.
///
/// Per-item failures do not fail the pipeline; the bulker logs and counts
/// them. A single malformed document must not stall replication of correct
/// documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    pub index: String,
    pub id: String,
    pub status: u16,
    pub reason: String,
}

/// Outcome of a bulk request whose transport succeeded.
#[derive(Debug, Clone, Default)]
pub struct BulkResponse {
    pub failures: Vec<BulkItemFailure>,
}

/// Trait for systems that can receive index mutation actions.
///
/// Implementations define how actions are written to the target system.
/// Operations should be idempotent where possible: delivery is at-least-once
/// and document ids are deterministic, so replays must converge.
pub trait Destination {
    /// Returns the name of the destination.
    fn name() -> &'static str;

    /// Submits a batch of actions in one round-trip.
    ///
    /// Submission order within the batch is preserved, but the sink's bulk
    /// semantics do not guarantee per-item atomicity. A transport-level
    /// failure is an `Err`; per-item failures come back in the response.
    fn bulk(&self, actions: Vec<Action>) -> impl Future<Output = SiltResult<BulkResponse>> + Send;

    /// Returns whether the target index exists.
    fn index_exists(&self, index: &str) -> impl Future<Output = SiltResult<bool>> + Send;

    /// Creates an index with the given settings.
    ///
    /// Only called for indexes that do not exist yet; existing indexes are
    /// never migrated.
    fn create_index(
        &self,
        index: &str,
        settings: Value,
    ) -> impl Future<Output = SiltResult<()>> + Send;
}
