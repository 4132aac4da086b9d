use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::Regex;
use silt_mysql::TableSchema;

use crate::error::{Error, SiltResult};
use crate::schema::Catalog;
use crate::types::table_key;

/// In-memory catalog fake.
///
/// Tables can be inserted and removed at any point, which makes it easy to
/// simulate schema drift and dropped tables between event generation and the
/// catalog query.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: Arc<Mutex<HashMap<String, TableSchema>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, table: TableSchema) {
        let key = table_key(&table.schema, &table.name);
        self.tables.lock().unwrap().insert(key, table);
    }

    pub fn remove(&self, schema: &str, table: &str) {
        self.tables.lock().unwrap().remove(&table_key(schema, table));
    }
}

impl Catalog for MemoryCatalog {
    async fn table_schema(&self, schema: &str, table: &str) -> SiltResult<Option<TableSchema>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.get(&table_key(schema, table)).cloned())
    }

    async fn expand_pattern(&self, schema: &str, pattern: &str) -> SiltResult<Vec<String>> {
        // RLIKE matches anywhere in the name, so the pattern stays unanchored.
        let regex = Regex::new(pattern)
            .map_err(|e| Error::other(format!("invalid pattern '{pattern}': {e}")))?;

        let tables = self.tables.lock().unwrap();
        let mut matched: Vec<String> = tables
            .values()
            .filter(|t| t.schema == schema && regex.is_match(&t.name))
            .map(|t| t.name.clone())
            .collect();
        matched.sort();

        Ok(matched)
    }
}
