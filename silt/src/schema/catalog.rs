use std::future::Future;

use silt_mysql::TableSchema;

use crate::error::SiltResult;

/// Live catalog query facility, backed by the replication connection.
///
/// The rule resolver uses it once at startup; the schema cache uses it on
/// cache miss during streaming.
pub trait Catalog {
    /// Fetches the current schema of one table.
    ///
    /// Returns `Ok(None)` when the table does not exist, either because it
    /// never did or because it was dropped between event generation and this
    /// query.
    fn table_schema(
        &self,
        schema: &str,
        table: &str,
    ) -> impl Future<Output = SiltResult<Option<TableSchema>>> + Send;

    /// Expands a table pattern in the server's `RLIKE` dialect against the
    /// catalog, restricted to one schema.
    fn expand_pattern(
        &self,
        schema: &str,
        pattern: &str,
    ) -> impl Future<Output = SiltResult<Vec<String>>> + Send;
}
