use serde::Deserialize;

use crate::shared::ValidationError;

/// Bulk submission thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BulkConfig {
    /// Maximum number of buffered actions before a bulk request is submitted.
    #[serde(default = "default_max_actions")]
    pub max_actions: usize,
    /// Maximum estimated payload bytes before a bulk request is submitted.
    ///
    /// Keep this well below the sink's hard request-size limit; the estimate
    /// tracks document bodies, not the final encoded request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl BulkConfig {
    pub const DEFAULT_MAX_ACTIONS: usize = 128;
    pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_actions == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "bulk.max_actions".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }
        if self.max_bytes == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "bulk.max_bytes".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_actions: default_max_actions(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_actions() -> usize {
    BulkConfig::DEFAULT_MAX_ACTIONS
}

fn default_max_bytes() -> u64 {
    BulkConfig::DEFAULT_MAX_BYTES
}
