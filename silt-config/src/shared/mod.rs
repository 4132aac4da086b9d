//! Shared configuration types for silt pipelines.

mod batch;
mod connection;
mod replicator;
mod rule;

pub use batch::BulkConfig;
pub use connection::{EsConnectionConfig, MySqlConnectionConfig};
pub use replicator::{DumpConfig, ReplicatorConfig};
pub use rule::{RuleConfig, SourceConfig};

use thiserror::Error;

/// Validation failure for a configuration value.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid value for field `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },

    #[error("missing required field `{field}`")]
    MissingField { field: String },
}
