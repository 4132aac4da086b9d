use std::collections::HashMap;

use silt_config::shared::{RuleConfig, SourceConfig};
use silt_mysql::{ColumnSchema, ColumnType, TableSchema};

/// A table shaped like the ones the scenario tests replicate: integer `id`
/// primary key, `title`/`content` strings, an enum, a set and a parent
/// column.
pub fn test_table(schema: &str, name: &str) -> TableSchema {
    TableSchema::new(
        schema,
        name,
        vec![
            ColumnSchema::new("id", ColumnType::Integer),
            ColumnSchema::new("title", ColumnType::String),
            ColumnSchema::new("content", ColumnType::String),
            ColumnSchema::new(
                "kind",
                ColumnType::Enum(vec!["e1".into(), "e2".into(), "e3".into()]),
            ),
            ColumnSchema::new(
                "tags",
                ColumnType::Set(vec!["a".into(), "b".into(), "c".into()]),
            ),
            ColumnSchema::new("pid", ColumnType::Integer),
        ],
        vec![0],
    )
}

pub fn test_source(schema: &str, tables: &[&str]) -> SourceConfig {
    SourceConfig {
        schema: schema.to_string(),
        tables: tables.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn test_rule_config(schema: &str, table: &str, index: &str) -> RuleConfig {
    RuleConfig {
        schema: schema.to_string(),
        table: table.to_string(),
        index: index.to_string(),
        doc_type: index.to_string(),
        parent: None,
        index_file: None,
        field_mapping: HashMap::new(),
    }
}
