use std::collections::HashMap;

use serde::Deserialize;

use crate::shared::ValidationError;

/// One source declaration: a schema plus the tables replicated out of it.
///
/// Table entries are either literal names or patterns in the server's `RLIKE`
/// dialect; patterns are expanded against the live catalog at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub schema: String,
    pub tables: Vec<String>,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema.is_empty() {
            return Err(ValidationError::MissingField {
                field: "source.schema".to_string(),
            });
        }
        if self.tables.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "source.tables".to_string(),
                constraint: "must list at least one table".to_string(),
            });
        }

        Ok(())
    }
}

/// A rule override mapping a source table (or pattern) onto an index and
/// document type, with optional parent designation and field renames.
///
/// Field map values take the form `"target_name[,list]"`; an empty target
/// keeps the source column name, and the `list` qualifier splits textual
/// values on commas.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub index: String,
    #[serde(default, rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Explicit index settings file; relative paths resolve against the
    /// configuration directory.
    #[serde(default, rename = "indexFile")]
    pub index_file: Option<String>,
    #[serde(default, rename = "field")]
    pub field_mapping: HashMap<String, String>,
}

impl RuleConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema.is_empty() {
            return Err(ValidationError::MissingField {
                field: "rule.schema".to_string(),
            });
        }
        if self.table.is_empty() {
            return Err(ValidationError::MissingField {
                field: "rule.table".to_string(),
            });
        }

        Ok(())
    }
}
