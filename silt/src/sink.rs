//! The row-event consumer shared by the dump phase and the binlog tailer.

use silt_mysql::TableSchema;
use tracing::debug;

use crate::bulker::{Bulker, BulkerStats};
use crate::conversion;
use crate::destination::Destination;
use crate::error::SiltResult;
use crate::rules::RuleSet;
use crate::types::RowEvent;
use std::sync::Arc;

/// Converts row events under their rules and feeds the bulker.
///
/// Events for tables that resolved to no rule are discarded silently; that is
/// the expected path for tables outside the configured sources.
#[derive(Debug)]
pub struct EventSink<D> {
    rules: Arc<RuleSet>,
    bulker: Bulker<D>,
}

impl<D: Destination> EventSink<D> {
    pub fn new(rules: Arc<RuleSet>, bulker: Bulker<D>) -> Self {
        Self { rules, bulker }
    }

    /// Handles one row event against the current table schema.
    ///
    /// An error here means either a malformed event or a failed auto-submit;
    /// the caller treats it as a stream interrupt.
    pub async fn handle(&mut self, table: &TableSchema, event: &RowEvent) -> SiltResult<()> {
        let Some(rule) = self.rules.get(&event.schema, &event.table) else {
            debug!(
                schema = %event.schema,
                table = %event.table,
                "ignoring event for table not configured for replication"
            );
            return Ok(());
        };

        let actions = conversion::convert(rule, table, event)?;
        self.bulker.add(actions).await
    }

    /// Submits whatever is buffered.
    pub async fn flush(&mut self) -> SiltResult<()> {
        self.bulker.submit().await
    }

    pub fn pending_actions(&self) -> usize {
        self.bulker.pending_actions()
    }

    pub fn stats(&self) -> BulkerStats {
        self.bulker.stats()
    }
}
