//! Declarative mapping rules and their resolution against the live catalog.
//!
//! A rule maps one source (schema, table) onto a target (index, document
//! type), optionally designating a parent-reference column and per-column
//! field renames. Source declarations may use table patterns in the server's
//! `RLIKE` dialect; patterns are expanded against the catalog exactly once at
//! startup, so a table created later that would match a pattern is not picked
//! up until restart.

use std::collections::HashMap;
use std::sync::Arc;

use silt_config::shared::{RuleConfig, SourceConfig};
use silt_mysql::TableSchema;

use crate::error::{Error, ErrorKind, SiltResult};
use crate::schema::Catalog;
use crate::types::table_key;

/// One resolved replication rule, bound to the table schema observed at
/// startup.
#[derive(Debug, Clone)]
pub struct Rule {
    pub schema: String,
    pub table: String,
    pub index: String,
    pub doc_type: String,
    /// Column whose value becomes the parent id and routing key.
    pub parent: Option<String>,
    /// Explicit index settings file for the bootstrapper.
    pub index_file: Option<String>,
    /// `source column -> "target[,list]"` renames.
    pub field_mapping: HashMap<String, String>,
    /// Startup snapshot of the table schema; the invariant that it has
    /// exactly one primary-key column is enforced during resolution.
    pub table_info: TableSchema,
}

/// The resolved rule lookup table, keyed by `schema:table`.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: HashMap<String, Rule>,
}

impl RuleSet {
    pub fn get(&self, schema: &str, table: &str) -> Option<&Rule> {
        self.rules.get(&table_key(schema, table))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Distinct schemas and all resolved tables, for dump targeting.
    pub fn schemas_and_tables(&self) -> (Vec<String>, Vec<String>) {
        let mut schemas: Vec<String> = Vec::new();
        let mut tables = Vec::with_capacity(self.rules.len());
        for rule in self.rules.values() {
            if !schemas.contains(&rule.schema) {
                schemas.push(rule.schema.clone());
            }
            tables.push(rule.table.clone());
        }
        (schemas, tables)
    }
}

/// Rule attributes before a table schema is bound.
#[derive(Debug, Clone)]
struct DraftRule {
    schema: String,
    table: String,
    index: String,
    doc_type: String,
    parent: Option<String>,
    index_file: Option<String>,
    field_mapping: HashMap<String, String>,
}

impl DraftRule {
    fn default_for(schema: &str, table: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            index: table.to_string(),
            doc_type: table.to_string(),
            parent: None,
            index_file: None,
            field_mapping: HashMap::new(),
        }
    }

    fn from_override(config: &RuleConfig, table: &str) -> Self {
        let index = if config.index.is_empty() {
            table.to_string()
        } else {
            config.index.clone()
        };
        let doc_type = if config.doc_type.is_empty() {
            index.clone()
        } else {
            config.doc_type.clone()
        };

        Self {
            schema: config.schema.clone(),
            table: table.to_string(),
            index,
            doc_type,
            parent: config.parent.clone(),
            index_file: config.index_file.clone(),
            field_mapping: config.field_mapping.clone(),
        }
    }
}

/// Returns true when the table entry is a literal name rather than a pattern.
///
/// Mirrors the source dialect: an entry that survives regex metacharacter
/// escaping unchanged contains no pattern syntax.
fn is_literal(entry: &str) -> bool {
    regex::escape(entry) == entry
}

/// Resolves source declarations and rule overrides into a [`RuleSet`].
pub async fn resolve<C: Catalog>(
    sources: &[SourceConfig],
    overrides: &[RuleConfig],
    catalog: &C,
) -> SiltResult<Arc<RuleSet>> {
    let mut drafts: HashMap<String, DraftRule> = HashMap::new();
    // Recorded pattern expansions: `schema:pattern` -> matched tables.
    let mut wild_tables: HashMap<String, Vec<String>> = HashMap::new();

    for source in sources {
        if source.schema.is_empty() {
            return Err(Error::source_config_invalid(
                "empty schema not allowed for source",
            ));
        }

        for entry in &source.tables {
            if is_literal(entry) {
                new_draft(&mut drafts, &source.schema, entry)?;
            } else {
                let pattern_key = table_key(&source.schema, entry);
                if wild_tables.contains_key(&pattern_key) {
                    return Err(Error::source_config_invalid(format!(
                        "duplicate wildcard table defined for {}.{}",
                        source.schema, entry
                    )));
                }

                let tables = catalog.expand_pattern(&source.schema, entry).await?;
                for table in &tables {
                    new_draft(&mut drafts, &source.schema, table)?;
                }
                wild_tables.insert(pattern_key, tables);
            }
        }
    }

    if drafts.is_empty() {
        return Err(Error::source_config_invalid("no source data defined"));
    }

    for config in overrides {
        if config.schema.is_empty() {
            return Err(Error::source_config_invalid(
                "empty schema not allowed for rule",
            ));
        }

        if is_literal(&config.table) {
            let key = table_key(&config.schema, &config.table);
            if !drafts.contains_key(&key) {
                return Err(Error::rule_invalid(
                    &config.schema,
                    &config.table,
                    "not defined in any source",
                ));
            }
            drafts.insert(key, DraftRule::from_override(config, &config.table));
        } else {
            let pattern_key = table_key(&config.schema, &config.table);
            let Some(tables) = wild_tables.get(&pattern_key) else {
                return Err(Error::rule_invalid(
                    &config.schema,
                    &config.table,
                    "wildcard table is not defined in any source",
                ));
            };
            if config.index.is_empty() {
                return Err(Error::rule_invalid(
                    &config.schema,
                    &config.table,
                    "wildcard table rule must carry a non-empty index",
                ));
            }

            for table in tables {
                let draft = DraftRule::from_override(config, table);
                drafts.insert(table_key(&config.schema, table), draft);
            }
        }
    }

    let mut rules = HashMap::with_capacity(drafts.len());
    for (key, draft) in drafts {
        let table_info = catalog
            .table_schema(&draft.schema, &draft.table)
            .await?
            .ok_or_else(|| Error::table_not_found(&draft.schema, &draft.table))?;

        let pk_count = table_info.primary_key_indices().len();
        if pk_count != 1 {
            return Err(Error::new(ErrorKind::PrimaryKeyInvalid {
                schema: draft.schema,
                table: draft.table,
                count: pk_count,
            }));
        }

        rules.insert(
            key,
            Rule {
                schema: draft.schema,
                table: draft.table,
                index: draft.index,
                doc_type: draft.doc_type,
                parent: draft.parent,
                index_file: draft.index_file,
                field_mapping: draft.field_mapping,
                table_info,
            },
        );
    }

    Ok(Arc::new(RuleSet { rules }))
}

fn new_draft(
    drafts: &mut HashMap<String, DraftRule>,
    schema: &str,
    table: &str,
) -> SiltResult<()> {
    let key = table_key(schema, table);
    if drafts.contains_key(&key) {
        return Err(Error::source_config_invalid(format!(
            "duplicate source {schema}.{table} defined in config"
        )));
    }
    drafts.insert(key, DraftRule::default_for(schema, table));
    Ok(())
}
