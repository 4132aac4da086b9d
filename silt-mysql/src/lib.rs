//! MySQL-side types shared across the silt workspace.
//!
//! Contains the table schema model used by the rule resolver and the schema
//! cache, binlog coordinates, and the small DDL parser that recognizes the
//! subset of `ALTER TABLE` statements replicated in-stream.

pub mod ddl;
pub mod position;
pub mod schema;

pub use ddl::{AlterOperation, AlterTableStatement, ParsedStatement, parse_statement};
pub use position::BinlogPosition;
pub use schema::{ColumnSchema, ColumnType, TableSchema};
