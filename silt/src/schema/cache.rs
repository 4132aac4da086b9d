use std::collections::HashMap;
use std::sync::Arc;

use silt_mysql::TableSchema;
use tracing::debug;

use crate::error::SiltResult;
use crate::rules::RuleSet;
use crate::schema::Catalog;
use crate::types::table_key;

/// Sentinel-aware cache entry.
#[derive(Debug)]
enum CacheEntry {
    Table(TableSchema),
    /// The table is not matched by any rule; later events short-circuit here
    /// without touching the catalog.
    Ignored,
}

/// Outcome of a cache lookup.
#[derive(Debug)]
pub enum SchemaLookup<'a> {
    Table(&'a TableSchema),
    /// Not matched by any rule.
    Ignored,
    /// Matched by a rule but absent from the catalog: the table was dropped
    /// between event generation and now, so the event is dropped.
    Missing,
}

/// Per-table column metadata, populated on miss and mutated only by
/// replicated column additions.
///
/// The cache is owned and mutated exclusively by the tailer task, the same
/// task that reads it, so it needs no interior locking. Pending actions must
/// be flushed before a mutation is applied so downstream action construction
/// never races schema evolution.
#[derive(Debug)]
pub struct SchemaCache<C> {
    catalog: C,
    rules: Arc<RuleSet>,
    entries: HashMap<String, CacheEntry>,
}

impl<C: Catalog> SchemaCache<C> {
    pub fn new(catalog: C, rules: Arc<RuleSet>) -> Self {
        Self {
            catalog,
            rules,
            entries: HashMap::new(),
        }
    }

    /// Pre-populates an entry, typically from the schemas bound into resolved
    /// rules at startup, sparing one catalog round-trip per table.
    pub fn seed(&mut self, table: TableSchema) {
        let key = table_key(&table.schema, &table.name);
        self.entries.insert(key, CacheEntry::Table(table));
    }

    /// Looks up a table, querying the catalog on miss.
    pub async fn lookup(&mut self, schema: &str, table: &str) -> SiltResult<SchemaLookup<'_>> {
        let key = table_key(schema, table);

        if !self.entries.contains_key(&key) {
            if self.rules.get(schema, table).is_none() {
                debug!(schema, table, "caching ignored-table sentinel");
                self.entries.insert(key.clone(), CacheEntry::Ignored);
            } else {
                match self.catalog.table_schema(schema, table).await? {
                    Some(fetched) => {
                        self.entries.insert(key.clone(), CacheEntry::Table(fetched));
                    }
                    // Dropped tables are not cached: a later CREATE with the
                    // same name must be able to repopulate.
                    None => return Ok(SchemaLookup::Missing),
                }
            }
        }

        match self.entries.get(&key) {
            Some(CacheEntry::Table(table_schema)) => Ok(SchemaLookup::Table(table_schema)),
            Some(CacheEntry::Ignored) => Ok(SchemaLookup::Ignored),
            None => Ok(SchemaLookup::Missing),
        }
    }

    /// Applies a replicated `ADD COLUMN` to the cached entry.
    ///
    /// Returns true when an entry was mutated. A miss is fine: the next
    /// lookup fetches the post-ALTER schema from the catalog anyway.
    pub fn apply_add_column(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
        declaration: &str,
    ) -> bool {
        let key = table_key(schema, table);
        match self.entries.get_mut(&key) {
            Some(CacheEntry::Table(table_schema)) => {
                table_schema.add_column(column, declaration);
                true
            }
            _ => false,
        }
    }
}
