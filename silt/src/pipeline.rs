//! Core orchestrator wiring the replication components together.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use silt_config::shared::ReplicatorConfig;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::bootstrap;
use crate::bulker::Bulker;
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::destination::Destination;
use crate::dump::{DumpHandler, Dumper};
use crate::error::{Error, ErrorKind, SiltResult};
use crate::metrics::{SILT_ROWS_DUMPED_TOTAL, register_metrics};
use crate::replication::{MySqlReplicationClient, Tailer};
use crate::rules;
use crate::schema::{Catalog, SchemaCache, SchemaLookup};
use crate::sink::EventSink;
use crate::state::PositionTracker;
use crate::types::{BinlogPosition, Cell, RowAction, RowEvent};

/// Row-image mode the source must run in; update handling depends on full
/// before/after images.
const REQUIRED_ROW_IMAGE: &str = "FULL";

enum PipelineState {
    Created,
    Started {
        tailer: JoinHandle<SiltResult<()>>,
    },
}

/// Coordinates the flow from MySQL through the converter and bulker into a
/// destination. Three phases:
/// 1. **Startup**: connect, resolve rules against the live catalog, create
///    target indexes.
/// 2. **Bootstrap**: parse a consistent logical dump into the sink and adopt
///    its binlog checkpoint (skipped when a saved position exists).
/// 3. **Streaming**: tail the binlog from that coordinate on a single task.
pub struct Pipeline<D> {
    config: Arc<ReplicatorConfig>,
    /// Directory of the configuration file; index settings files resolve
    /// against it.
    config_dir: PathBuf,
    destination: D,
    state: PipelineState,
    shutdown_tx: ShutdownTx,
}

impl<D> Pipeline<D>
where
    D: Destination + Clone + Send + Sync + 'static,
{
    /// Creates a new pipeline in the `Created` state. Call
    /// [`Pipeline::start`] to begin replication.
    pub fn new(config: ReplicatorConfig, config_dir: PathBuf, destination: D) -> Self {
        register_metrics();
        let (shutdown_tx, _shutdown_rx) = create_shutdown_channel();
        Self {
            config: Arc::new(config),
            config_dir,
            destination,
            state: PipelineState::Created,
            shutdown_tx,
        }
    }

    /// Starts the pipeline and begins replication.
    pub async fn start(&mut self) -> SiltResult<()> {
        info!(
            source = %self.config.mysql.host,
            sink = %self.config.elasticsearch.url,
            "starting pipeline"
        );

        let client = MySqlReplicationClient::connect(&self.config.mysql).await?;
        client.check_binlog_row_image(REQUIRED_ROW_IMAGE).await?;

        let rules = rules::resolve(&self.config.sources, &self.config.rules, &client).await?;
        info!(rules = rules.len(), "resolved replication rules");

        bootstrap::create_indexes(&self.config_dir, &rules, &self.destination).await?;

        let mut positions = PositionTracker::load(&self.config.data_dir).await?;
        let mut schema_cache = SchemaCache::new(client.clone(), rules.clone());
        for rule in rules.iter() {
            schema_cache.seed(rule.table_info.clone());
        }
        let mut sink = EventSink::new(
            rules.clone(),
            Bulker::new(self.destination.clone(), self.config.bulk.clone()),
        );

        if positions.current().is_none() {
            self.run_dump(&rules, &mut schema_cache, &mut sink, &mut positions)
                .await?;
        }

        let position = positions
            .current()
            .cloned()
            .ok_or_else(|| Error::dump_parse_failed("dump produced no binlog checkpoint"))?;

        let stream = client.binlog_stream(&position).await?;
        let tailer = Tailer::new(
            schema_cache,
            sink,
            positions,
            Duration::from_millis(self.config.read_timeout_ms),
            self.shutdown_tx.subscribe(),
        );

        let handle = tokio::spawn(tailer.run(stream));
        self.state = PipelineState::Started { tailer: handle };

        Ok(())
    }

    /// Bootstraps initial state from the external dump.
    async fn run_dump<C: Catalog + Send + Sync>(
        &self,
        rules: &Arc<rules::RuleSet>,
        schema_cache: &mut SchemaCache<C>,
        sink: &mut EventSink<D>,
        positions: &mut PositionTracker,
    ) -> SiltResult<()> {
        let mut dumper = Dumper::new(&self.config.mysql, &self.config.dump, &self.config.data_dir);

        let (schemas, tables) = rules.schemas_and_tables();
        if let [schema] = schemas.as_slice() {
            // One schema: the dump can shrink to exactly the resolved tables.
            dumper.set_tables(schema, tables);
        } else {
            dumper.set_databases(schemas);
        }

        info!("bootstrapping from dump");
        let mut handler = DumpSink {
            schema_cache: &mut *schema_cache,
            sink: &mut *sink,
            positions: &mut *positions,
        };
        dumper.dump_and_parse(&mut handler).await?;

        sink.flush().await?;
        positions.save(true).await?;
        info!(stats = ?sink.stats(), "dump complete");

        Ok(())
    }

    /// Initiates a graceful shutdown of the pipeline.
    ///
    /// The tailer drains in-flight actions, flushes the bulker one final time
    /// and force-saves the position before returning. Call
    /// [`Pipeline::wait`] to wait for that to complete.
    pub fn shutdown(&self) {
        info!("sending shutdown signal to pipeline");
        let _ = self.shutdown_tx.send(true);
    }

    /// Returns a handle that can trigger shutdown from another task.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Waits for the pipeline to complete all work.
    pub async fn wait(self) -> SiltResult<()> {
        let PipelineState::Started { tailer } = self.state else {
            info!("pipeline was not started, skipping wait");
            return Ok(());
        };

        match tailer.await {
            Ok(result) => result,
            Err(join_error) => Err(Error::with_source(ErrorKind::WorkerPanicked, join_error)),
        }
    }

    /// Signals a graceful shutdown and then waits for completion.
    pub async fn shutdown_and_wait(self) -> SiltResult<()> {
        self.shutdown();
        self.wait().await
    }
}

/// Adapter feeding parsed dump records into the regular event path, so the
/// dump reads as a stream prefix.
struct DumpSink<'a, C, D> {
    schema_cache: &'a mut SchemaCache<C>,
    sink: &'a mut EventSink<D>,
    positions: &'a mut PositionTracker,
}

impl<C, D> DumpHandler for DumpSink<'_, C, D>
where
    C: Catalog + Send + Sync,
    D: Destination + Send + Sync,
{
    async fn binlog_position(&mut self, file: &str, pos: u64) -> SiltResult<()> {
        info!(file, pos, "dump checkpoint");
        self.positions.reset(BinlogPosition::new(file, pos));
        Ok(())
    }

    async fn row(&mut self, schema: &str, table: &str, values: Vec<Cell>) -> SiltResult<()> {
        match self.schema_cache.lookup(schema, table).await? {
            SchemaLookup::Table(table_schema) => {
                let table_schema = table_schema.clone();
                let event = RowEvent::new(schema, table, RowAction::Insert, vec![values]);
                counter!(SILT_ROWS_DUMPED_TOTAL).increment(1);
                self.sink.handle(&table_schema, &event).await
            }
            SchemaLookup::Ignored | SchemaLookup::Missing => {
                debug!(schema, table, "skipping dump row for unreplicated table");
                Ok(())
            }
        }
    }
}
