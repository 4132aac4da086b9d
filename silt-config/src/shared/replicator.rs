use std::path::PathBuf;

use serde::Deserialize;

use crate::shared::{
    BulkConfig, EsConnectionConfig, MySqlConnectionConfig, RuleConfig, SourceConfig,
    ValidationError,
};

/// External dump tool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DumpConfig {
    /// Path to the dump executable. A path ending in `mydumper` selects the
    /// parallel directory-based dumper, anything else is treated as a
    /// `mysqldump`-compatible stream dumper.
    #[serde(default = "default_dump_exec")]
    pub exec_path: String,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            exec_path: default_dump_exec(),
        }
    }
}

fn default_dump_exec() -> String {
    "mydumper".to_string()
}

/// Complete configuration for one replicator process.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid
/// accidentally leaking secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplicatorConfig {
    /// Directory for position persistence and dump staging.
    pub data_dir: PathBuf,
    pub mysql: MySqlConnectionConfig,
    pub elasticsearch: EsConnectionConfig,
    #[serde(default)]
    pub dump: DumpConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
    /// Base soft read timeout for the binlog poll loop, in milliseconds.
    /// Governs the idle-flush cadence.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

impl ReplicatorConfig {
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.mysql.validate()?;
        self.elasticsearch.validate()?;
        self.bulk.validate()?;

        if self.data_dir.as_os_str().is_empty() {
            return Err(ValidationError::MissingField {
                field: "data_dir".to_string(),
            });
        }
        if self.read_timeout_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "read_timeout_ms".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }
        if self.sources.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "source".to_string(),
                constraint: "at least one source entry is required".to_string(),
            });
        }
        for source in &self.sources {
            source.validate()?;
        }
        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }
}

fn default_read_timeout_ms() -> u64 {
    ReplicatorConfig::DEFAULT_READ_TIMEOUT_MS
}
