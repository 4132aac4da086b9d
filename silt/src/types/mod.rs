//! Common types used throughout the replication engine.

mod action;
mod cell;
mod event;

pub use action::*;
pub use cell::*;
pub use event::*;

// Re-exports.
pub use silt_mysql::{BinlogPosition, ColumnSchema, ColumnType, TableSchema};

/// Cache and rule lookup key for a source table, `schema:table`.
pub fn table_key(schema: &str, table: &str) -> String {
    format!("{schema}:{table}")
}
