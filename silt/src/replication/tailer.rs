use std::time::Duration;

use silt_mysql::{AlterOperation, ParsedStatement, parse_statement};
use tracing::{debug, info, trace, warn};

use crate::concurrency::shutdown::{ShutdownRx, is_shutting_down};
use crate::destination::Destination;
use crate::error::{Error, ErrorKind, SiltResult};
use crate::replication::stream::{TailEvent, TailSource};
use crate::schema::{Catalog, SchemaCache, SchemaLookup};
use crate::sink::EventSink;
use crate::state::PositionTracker;
use crate::types::{RowEvent, table_key};

/// The binlog tailer: consumes tail events in source order on a single task
/// and drives the sink.
///
/// Event handling downstream of the tailer is single-consumer and strictly
/// ordered; within one (index, document id) the emitted actions match the
/// order of the source row events that produced them.
pub struct Tailer<C, D> {
    schema_cache: SchemaCache<C>,
    sink: EventSink<D>,
    positions: PositionTracker,
    read_timeout: Duration,
    shutdown_rx: ShutdownRx,
}

impl<C: Catalog, D: Destination> Tailer<C, D> {
    pub fn new(
        schema_cache: SchemaCache<C>,
        sink: EventSink<D>,
        positions: PositionTracker,
        read_timeout: Duration,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            schema_cache,
            sink,
            positions,
            read_timeout,
            shutdown_rx,
        }
    }

    /// Runs the tail loop until shutdown or a stream-aborting error.
    ///
    /// The soft read timeout implements the idle flush: the first expiry
    /// widens the timeout to twice the base, the second consecutive expiry
    /// flushes the pipeline so low-traffic tables do not leave actions
    /// lingering in the bulker. Any delivered event resets the timeout.
    pub async fn run<S: TailSource>(mut self, mut source: S) -> SiltResult<()> {
        let base_timeout = self.read_timeout;
        let mut timeout = base_timeout;

        loop {
            if is_shutting_down(&self.shutdown_rx) {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => break,
                next = tokio::time::timeout(timeout, source.next_event()) => next,
            };

            match next {
                Err(_elapsed) => {
                    if timeout == base_timeout * 2 {
                        debug!("flushing pipeline since sync has gone idle");
                        if let Err(err) = self.sink.flush().await {
                            warn!(error = %err, "idle flush failed");
                        } else {
                            self.save_if_drained(false).await?;
                        }
                    }
                    timeout *= 2;
                }
                Ok(None) => {
                    if is_shutting_down(&self.shutdown_rx) {
                        break;
                    }
                    return Err(Error::new(ErrorKind::BinlogStreamEnded));
                }
                Ok(Some(Err(err))) => {
                    if is_shutting_down(&self.shutdown_rx) {
                        break;
                    }
                    return Err(err);
                }
                Ok(Some(Ok(event))) => {
                    timeout = base_timeout;
                    self.handle_event(event).await?;
                }
            }
        }

        // Drain on the way out: in-flight work reaches the sink before the
        // final position save, so the persisted coordinate never runs ahead
        // of acknowledged actions.
        self.sink.flush().await?;
        self.positions.save(true).await?;
        info!("tailer stopped");

        Ok(())
    }

    async fn handle_event(&mut self, event: TailEvent) -> SiltResult<()> {
        match event {
            TailEvent::Rotate { position } => {
                self.sink.flush().await?;
                info!(%position, "rotating binlog");
                self.positions.reset(position);
                self.positions.save(true).await?;
            }
            TailEvent::Rows {
                schema,
                table,
                action,
                rows,
                next_offset,
            } => {
                match self.schema_cache.lookup(&schema, &table).await? {
                    SchemaLookup::Table(table_schema) => {
                        let event = RowEvent::new(schema, table, action, rows);
                        let table_schema = table_schema.clone();
                        self.sink.handle(&table_schema, &event).await?;
                    }
                    SchemaLookup::Ignored => {
                        debug!(key = %table_key(&schema, &table), "ignoring event for unruled table");
                    }
                    SchemaLookup::Missing => {
                        warn!(key = %table_key(&schema, &table), "dropping event for vanished table");
                    }
                }
                self.advance(next_offset).await?;
            }
            TailEvent::Query {
                schema,
                query,
                next_offset,
            } => {
                self.handle_query(&schema, &query).await?;
                self.advance(next_offset).await?;
            }
            TailEvent::Other { next_offset } => {
                trace!(next_offset, "ignoring event");
                self.advance(next_offset).await?;
            }
        }

        Ok(())
    }

    async fn handle_query(&mut self, session_schema: &str, query: &str) -> SiltResult<()> {
        let statement = match parse_statement(query) {
            Ok(ParsedStatement::Alter(statement)) => statement,
            Ok(ParsedStatement::Ignored) => {
                trace!(query, "ignoring replicated statement");
                return Ok(());
            }
            Err(reason) => {
                info!(query, reason = %reason, "ignoring unrecognized DDL");
                return Ok(());
            }
        };

        let schema = if statement.schema.is_empty() {
            session_schema
        } else {
            &statement.schema
        };

        match statement.operation {
            AlterOperation::Add => {
                // Actions built against the old schema must reach the sink
                // before any new-schema action is constructed.
                self.sink.flush().await?;
                let applied = self.schema_cache.apply_add_column(
                    schema,
                    &statement.table,
                    &statement.column,
                    &statement.column_type,
                );
                info!(
                    schema,
                    table = %statement.table,
                    column = %statement.column,
                    column_type = %statement.column_type,
                    applied,
                    "replicated column addition"
                );
            }
            AlterOperation::Modify | AlterOperation::Drop => {
                info!(
                    schema,
                    table = %statement.table,
                    column = %statement.column,
                    "replicated ALTER operation recognized but not applied"
                );
            }
        }

        Ok(())
    }

    /// Advances the in-file offset and performs a heartbeat save when safe.
    async fn advance(&mut self, next_offset: u64) -> SiltResult<()> {
        if next_offset > 0 {
            self.positions.update_offset(next_offset);
        }
        self.save_if_drained(false).await
    }

    /// Saves only when the bulker is empty: the persisted position must never
    /// run ahead of actions the sink has not acknowledged yet.
    async fn save_if_drained(&mut self, force: bool) -> SiltResult<()> {
        if self.sink.pending_actions() == 0 {
            self.positions.save(force).await?;
        }
        Ok(())
    }
}
