//! Replication engine mirroring MySQL tables into a document search index.
//!
//! The pipeline bootstraps initial state from a consistent logical dump, tails
//! the row-based binlog from the dump's checkpoint, maps row events through a
//! declarative rule set into index mutation actions, and submits those actions
//! in adaptively flushed batches.

pub mod bootstrap;
pub mod bulker;
pub mod concurrency;
pub mod conversion;
pub mod destination;
pub mod dump;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod replication;
pub mod rules;
pub mod schema;
pub mod sink;
pub mod state;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
