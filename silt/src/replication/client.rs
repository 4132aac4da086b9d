use mysql_async::prelude::*;
use mysql_async::{BinlogStreamRequest, Opts, OptsBuilder, Pool, Row};
use secrecy::ExposeSecret;
use silt_config::shared::MySqlConnectionConfig;
use silt_mysql::{BinlogPosition, ColumnSchema, ColumnType, TableSchema};
use tracing::info;

use crate::error::{Error, ErrorKind, SiltResult};
use crate::replication::stream::TailEventStream;
use crate::schema::Catalog;

/// Connection handle to the source server.
///
/// Owns a connection pool used for catalog queries and hands out the binlog
/// follower stream. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct MySqlReplicationClient {
    pool: Pool,
    server_id: u32,
}

impl MySqlReplicationClient {
    /// Connects to the source and verifies connectivity with one round-trip.
    pub async fn connect(config: &MySqlConnectionConfig) -> SiltResult<Self> {
        let mut builder = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.username.clone()));
        if let Some(password) = &config.password {
            builder = builder.pass(Some(password.expose_secret().to_string()));
        }

        let pool = Pool::new(Opts::from(builder));
        pool.get_conn().await.map_err(|e| {
            Error::with_source(
                ErrorKind::ConnectionFailed {
                    host: config.host.clone(),
                    port: config.port,
                },
                e,
            )
        })?;

        info!(host = %config.host, port = config.port, server_id = config.server_id, "connected to source");

        Ok(Self {
            pool,
            server_id: config.server_id,
        })
    }

    /// Verifies that the server logs full row images; update handling depends
    /// on complete before/after images.
    pub async fn check_binlog_row_image(&self, expected: &str) -> SiltResult<()> {
        let mut conn = self.pool.get_conn().await?;
        let row: Option<(String, String)> = conn
            .query_first("SHOW GLOBAL VARIABLES LIKE 'binlog_row_image'")
            .await?;

        let actual = row.map(|(_, value)| value).unwrap_or_default();
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(Error::new(ErrorKind::ReplicaConfigInvalid {
                variable: "binlog_row_image".to_string(),
                expected: expected.to_string(),
                actual,
            }));
        }

        Ok(())
    }

    /// Reads the server's current binlog coordinate.
    pub async fn master_position(&self) -> SiltResult<BinlogPosition> {
        let mut conn = self.pool.get_conn().await?;
        let row: Option<Row> = conn.query_first("SHOW MASTER STATUS").await?;
        let row = row.ok_or_else(|| {
            Error::other("SHOW MASTER STATUS returned no rows; is binlog enabled?")
        })?;

        let file: String = row
            .get(0)
            .ok_or_else(|| Error::other("SHOW MASTER STATUS row has no File column"))?;
        let offset: u64 = row
            .get(1)
            .ok_or_else(|| Error::other("SHOW MASTER STATUS row has no Position column"))?;

        Ok(BinlogPosition::new(file, offset))
    }

    /// Subscribes as a replication follower from the given coordinate.
    ///
    /// The stream identifies itself with the configured numeric server id and
    /// delivers events in source order.
    pub async fn binlog_stream(&self, position: &BinlogPosition) -> SiltResult<TailEventStream> {
        let conn = self.pool.get_conn().await?;
        let request = BinlogStreamRequest::new(self.server_id)
            .with_filename(position.file.as_bytes())
            .with_pos(position.offset);

        let stream = conn
            .get_binlog_stream(request)
            .await
            .map_err(|e| Error::with_source(ErrorKind::BinlogStreamFailed, e))?;

        info!(position = %position, server_id = self.server_id, "binlog stream started");

        Ok(TailEventStream::new(stream))
    }
}

impl Catalog for MySqlReplicationClient {
    async fn table_schema(&self, schema: &str, table: &str) -> SiltResult<Option<TableSchema>> {
        let mut conn = self.pool.get_conn().await?;
        let rows: Vec<(String, String, String, String)> = conn
            .exec(
                "SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE, COLUMN_KEY \
                 FROM information_schema.columns \
                 WHERE table_schema = ? AND table_name = ? \
                 ORDER BY ORDINAL_POSITION",
                (schema, table),
            )
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut columns = Vec::with_capacity(rows.len());
        let mut pk_indices = Vec::new();
        for (i, (name, data_type, column_type, column_key)) in rows.into_iter().enumerate() {
            if column_key == "PRI" {
                pk_indices.push(i);
            }
            columns.push(ColumnSchema::new(
                name,
                ColumnType::from_information_schema(&data_type, &column_type),
            ));
        }

        Ok(Some(TableSchema::new(schema, table, columns, pk_indices)))
    }

    async fn expand_pattern(&self, schema: &str, pattern: &str) -> SiltResult<Vec<String>> {
        let mut conn = self.pool.get_conn().await?;
        let tables: Vec<String> = conn
            .exec(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_name RLIKE ? AND table_schema = ?",
                (pattern, schema),
            )
            .await?;

        Ok(tables)
    }
}
