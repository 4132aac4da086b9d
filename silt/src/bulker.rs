//! Buffers actions and submits them in bulk when thresholds are reached.

use std::time::Instant;

use metrics::{counter, gauge, histogram};
use silt_config::shared::BulkConfig;
use tracing::{debug, error};

use crate::destination::Destination;
use crate::error::SiltResult;
use crate::metrics::{
    ACTION_KIND_LABEL, SILT_ACTIONS_TOTAL, SILT_BULK_BATCH_SIZE, SILT_BULK_ITEM_FAILURES_TOTAL,
    SILT_BULK_SEND_DURATION_MILLISECONDS,
};
use crate::types::{Action, ActionKind};

/// How many per-item failures of one response are logged before truncating.
const LOGGED_ITEM_FAILURES: usize = 3;

/// Running counters over everything the bulker has accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkerStats {
    pub index_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    pub total: u64,
    /// Per-item failures reported by the sink; these never stop the pipeline.
    pub item_failures: u64,
}

/// Accumulates actions and flushes them through the destination.
///
/// A batch is submitted as soon as appending an action reaches either the
/// count or the estimated-bytes threshold; the owner triggers explicit
/// flushes on idle, DDL boundaries and shutdown.
#[derive(Debug)]
pub struct Bulker<D> {
    destination: D,
    config: BulkConfig,
    pending: Vec<Action>,
    pending_bytes: u64,
    stats: BulkerStats,
}

impl<D: Destination> Bulker<D> {
    pub fn new(destination: D, config: BulkConfig) -> Self {
        let pending = Vec::with_capacity(config.max_actions);
        Self {
            destination,
            config,
            pending,
            pending_bytes: 0,
            stats: BulkerStats::default(),
        }
    }

    /// Number of actions buffered since the last submit.
    pub fn pending_actions(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> BulkerStats {
        self.stats
    }

    /// Appends actions, auto-submitting whenever a threshold is reached.
    ///
    /// A returned error is a transport failure from an auto-submit; the
    /// caller decides whether to retry or abort the stream.
    pub async fn add(&mut self, actions: Vec<Action>) -> SiltResult<()> {
        for action in actions {
            match action.kind() {
                ActionKind::Index => self.stats.index_count += 1,
                ActionKind::Update => self.stats.update_count += 1,
                ActionKind::Delete => self.stats.delete_count += 1,
            }
            self.stats.total += 1;
            counter!(SILT_ACTIONS_TOTAL, ACTION_KIND_LABEL => action.kind().to_string())
                .increment(1);

            self.pending_bytes += action.size_hint() as u64;
            self.pending.push(action);

            if self.pending.len() >= self.config.max_actions
                || self.pending_bytes >= self.config.max_bytes
            {
                self.submit().await?;
            }
        }

        Ok(())
    }

    /// Submits the current batch in one request and clears the buffer.
    ///
    /// An empty buffer is a successful no-op. Per-item failures in a
    /// successful response are logged (first three, with a truncation marker
    /// beyond that) and counted, but deliberately do not fail the pipeline:
    /// a single malformed document must not stall replication of the rest.
    pub async fn submit(&mut self) -> SiltResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let batch = std::mem::replace(
            &mut self.pending,
            Vec::with_capacity(self.config.max_actions),
        );
        let batch_size = batch.len();
        self.pending_bytes = 0;

        gauge!(SILT_BULK_BATCH_SIZE).set(batch_size as f64);

        let started = Instant::now();
        let response = match self.destination.bulk(batch).await {
            Ok(response) => response,
            Err(err) => {
                error!(batch_size, error = %err, "bulk submission failed");
                return Err(err);
            }
        };
        histogram!(SILT_BULK_SEND_DURATION_MILLISECONDS)
            .record(started.elapsed().as_millis() as f64);

        if response.failures.is_empty() {
            debug!(batch_size, "bulk submission succeeded");
            return Ok(());
        }

        self.stats.item_failures += response.failures.len() as u64;
        counter!(SILT_BULK_ITEM_FAILURES_TOTAL).increment(response.failures.len() as u64);

        for failure in response.failures.iter().take(LOGGED_ITEM_FAILURES) {
            error!(
                index = %failure.index,
                id = %failure.id,
                status = failure.status,
                reason = %failure.reason,
                "bulk action failed"
            );
        }
        if response.failures.len() > LOGGED_ITEM_FAILURES {
            error!(
                "... and {} more failed actions in this bulk response",
                response.failures.len() - LOGGED_ITEM_FAILURES
            );
        }

        Ok(())
    }
}
