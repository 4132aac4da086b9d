//! Converts row events under their rule into index mutation actions.
//!
//! This is a pure mapping with no side effects beyond logging. The table
//! schema is passed in separately from the rule because the schema cache is
//! authoritative at runtime: replicated column additions mutate the cached
//! schema while the rule keeps its startup snapshot.

use serde_json::Value;
use silt_mysql::{ColumnSchema, ColumnType, TableSchema};
use tracing::debug;

use crate::error::{Error, ErrorKind, SiltResult};
use crate::rules::Rule;
use crate::types::{Action, ActionMeta, Cell, DocumentBody, RowAction, RowEvent};

/// Qualifier in a field mapping value that coerces textual values to lists.
const FIELD_TYPE_LIST: &str = "list";

/// Maps a row event into the sequence of actions that mirrors it in the sink.
pub fn convert(rule: &Rule, table: &TableSchema, event: &RowEvent) -> SiltResult<Vec<Action>> {
    debug!(schema = %event.schema, table = %event.table, action = %event.action, rows = event.rows.len(), "converting row event");

    match event.action {
        RowAction::Insert => convert_insert(rule, table, &event.rows),
        RowAction::Delete => convert_delete(rule, table, &event.rows),
        RowAction::Update => convert_update(rule, table, &event.rows),
    }
}

/// Synthesizes the document id from the primary-key column values.
///
/// Values are rendered textually; multiple primary-key columns would be
/// joined by `:`, though rule resolution currently requires exactly one.
pub fn doc_id(table: &TableSchema, row: &[Cell]) -> SiltResult<String> {
    let mut id = String::new();
    for (i, pk_index) in table.primary_key_indices().iter().enumerate() {
        let cell = row.get(*pk_index).ok_or_else(|| {
            Error::malformed_row_event(format!(
                "row for {table} has {} cells, primary key expects index {pk_index}",
                row.len()
            ))
        })?;
        let text = cell.as_id_text().ok_or_else(|| {
            Error::new(ErrorKind::NullPrimaryKey {
                table: table.to_string(),
            })
        })?;

        if i > 0 {
            id.push(':');
        }
        id.push_str(&text);
    }

    Ok(id)
}

/// Renders the parent id from the rule's parent column, or the empty string
/// when no parent is configured.
pub fn parent_id(rule: &Rule, table: &TableSchema, row: &[Cell]) -> SiltResult<String> {
    let Some(parent_column) = &rule.parent else {
        return Ok(String::new());
    };

    let index = table
        .find_column(parent_column)
        .ok_or_else(|| Error::column_not_found(table.to_string(), parent_column))?;
    Ok(row
        .get(index)
        .and_then(Cell::as_id_text)
        .unwrap_or_default())
}

fn meta(rule: &Rule, id: String, parent: String) -> ActionMeta {
    ActionMeta {
        index: rule.index.clone(),
        doc_type: rule.doc_type.clone(),
        id,
        parent,
    }
}

fn convert_insert(rule: &Rule, table: &TableSchema, rows: &[Vec<Cell>]) -> SiltResult<Vec<Action>> {
    let mut actions = Vec::with_capacity(rows.len());
    for row in rows {
        let id = doc_id(table, row)?;
        let parent = parent_id(rule, table, row)?;
        actions.push(Action::index(
            meta(rule, id, parent),
            full_document(rule, table, row),
        ));
    }
    Ok(actions)
}

fn convert_delete(rule: &Rule, table: &TableSchema, rows: &[Vec<Cell>]) -> SiltResult<Vec<Action>> {
    let mut actions = Vec::with_capacity(rows.len());
    for row in rows {
        let id = doc_id(table, row)?;
        let parent = parent_id(rule, table, row)?;
        actions.push(Action::delete(meta(rule, id, parent)));
    }
    Ok(actions)
}

fn convert_update(rule: &Rule, table: &TableSchema, rows: &[Vec<Cell>]) -> SiltResult<Vec<Action>> {
    if rows.len() % 2 != 0 {
        return Err(Error::malformed_row_event(format!(
            "update event must carry before/after image pairs, got {} rows",
            rows.len()
        )));
    }

    let mut actions = Vec::with_capacity(rows.len());
    for pair in rows.chunks_exact(2) {
        let (before, after) = (&pair[0], &pair[1]);

        let before_id = doc_id(table, before)?;
        let after_id = doc_id(table, after)?;
        let before_parent = parent_id(rule, table, before)?;
        let after_parent = parent_id(rule, table, after)?;

        if before_id != after_id || before_parent != after_parent {
            // A changed primary key or parent changes the document identity;
            // neither underlying system renames documents cheaply, so mirror
            // it as a tombstone plus a fresh document. Correct under
            // at-least-once because the delete is idempotent.
            actions.push(Action::delete(meta(rule, before_id, before_parent)));
            actions.push(Action::index(
                meta(rule, after_id, after_parent),
                full_document(rule, table, after),
            ));
        } else {
            actions.push(Action::update(
                meta(rule, before_id, before_parent),
                partial_document(rule, table, before, after),
            ));
        }
    }

    Ok(actions)
}

/// Builds the full document body for a row.
///
/// Iteration pairs columns with cells positionally and stops at the shorter
/// side, tolerating rows produced against a schema revision other than the
/// cached one.
fn full_document(rule: &Rule, table: &TableSchema, row: &[Cell]) -> DocumentBody {
    let mut body = DocumentBody::new();
    for (column, cell) in table.columns().iter().zip(row) {
        let (field, value) = convert_field(rule, column, cell);
        body.insert(field, value);
    }
    body
}

/// Builds the partial body for an in-place update: exactly the fields whose
/// before/after values differ, plus fields present only in the after image
/// (a column added mid-transaction).
fn partial_document(
    rule: &Rule,
    table: &TableSchema,
    before: &[Cell],
    after: &[Cell],
) -> DocumentBody {
    let mut body = DocumentBody::new();
    for (i, column) in table.columns().iter().enumerate() {
        let Some(after_cell) = after.get(i) else {
            break;
        };
        if before.get(i) != Some(after_cell) {
            let (field, value) = convert_field(rule, column, after_cell);
            body.insert(field, value);
        }
    }
    body
}

/// Normalizes one cell against its column type and applies the rule's field
/// mapping.
fn convert_field(rule: &Rule, column: &ColumnSchema, cell: &Cell) -> (String, Value) {
    let value = normalize_cell(column, cell);

    let Some(mapping) = rule.field_mapping.get(&column.name) else {
        return (column.name.clone(), value);
    };
    let (target, qualifier) = parse_field_mapping(&column.name, mapping);

    if qualifier == FIELD_TYPE_LIST
        && let Value::String(text) = &value
    {
        let list = text
            .split(',')
            .map(|part| Value::String(part.to_string()))
            .collect();
        return (target, Value::Array(list));
    }

    (target, value)
}

/// Column value normalization:
/// enum ordinals resolve to their declared label (1-based; out of range maps
/// to the empty string), set bitmasks to comma-joined labels in declared
/// order, byte strings reinterpret as text for string columns, and integers
/// widen for float columns. Everything else passes through.
fn normalize_cell(column: &ColumnSchema, cell: &Cell) -> Value {
    match (&column.column_type, cell) {
        (ColumnType::Enum(labels), _) => {
            if let Some(ordinal) = cell.as_int() {
                let label = ordinal
                    .checked_sub(1)
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| labels.get(i));
                match label {
                    Some(label) => Value::String(label.clone()),
                    None => Value::String(String::new()),
                }
            } else {
                cell_to_json(cell)
            }
        }
        (ColumnType::Set(labels), _) => {
            if let Some(bitmask) = cell.as_int() {
                let selected: Vec<&str> = labels
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| bitmask & (1i64 << i) != 0)
                    .map(|(_, label)| label.as_str())
                    .collect();
                Value::String(selected.join(","))
            } else {
                cell_to_json(cell)
            }
        }
        (ColumnType::String, Cell::Bytes(bytes)) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        (ColumnType::Float, Cell::Int(v)) => json_number(*v as f64),
        (ColumnType::Float, Cell::UInt(v)) => json_number(*v as f64),
        _ => cell_to_json(cell),
    }
}

fn cell_to_json(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Int(v) => Value::from(*v),
        Cell::UInt(v) => Value::from(*v),
        Cell::Float(v) => json_number(*v),
        Cell::String(v) => Value::String(v.clone()),
        Cell::Bytes(v) => Value::String(String::from_utf8_lossy(v).into_owned()),
    }
}

fn json_number(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Splits a `"target[,qualifier]"` mapping value. An empty target keeps the
/// source column name.
fn parse_field_mapping<'a>(source: &str, mapping: &'a str) -> (String, &'a str) {
    let (target, qualifier) = match mapping.split_once(',') {
        Some((target, qualifier)) => (target, qualifier),
        None => (mapping, ""),
    };

    let target = if target.is_empty() { source } else { target };
    (target.to_string(), qualifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_mapping_defaults_to_source_name() {
        assert_eq!(parse_field_mapping("title", ""), ("title".into(), ""));
        assert_eq!(
            parse_field_mapping("title", "es_title"),
            ("es_title".into(), "")
        );
        assert_eq!(
            parse_field_mapping("tags", ",list"),
            ("tags".into(), "list")
        );
        assert_eq!(
            parse_field_mapping("tags", "es_tags,list"),
            ("es_tags".into(), "list")
        );
    }

    #[test]
    fn enum_out_of_range_becomes_empty_string() {
        let column = ColumnSchema::new(
            "status",
            ColumnType::Enum(vec!["on".into(), "off".into()]),
        );
        assert_eq!(
            normalize_cell(&column, &Cell::Int(2)),
            Value::String("off".into())
        );
        assert_eq!(
            normalize_cell(&column, &Cell::Int(3)),
            Value::String(String::new())
        );
        assert_eq!(
            normalize_cell(&column, &Cell::Int(0)),
            Value::String(String::new())
        );
    }

    #[test]
    fn set_bitmask_joins_declared_labels() {
        let column = ColumnSchema::new(
            "perms",
            ColumnType::Set(vec!["r".into(), "w".into(), "x".into()]),
        );
        assert_eq!(
            normalize_cell(&column, &Cell::Int(0b101)),
            Value::String("r,x".into())
        );
        assert_eq!(
            normalize_cell(&column, &Cell::Int(0)),
            Value::String(String::new())
        );
    }

    #[test]
    fn string_bytes_reinterpret_and_float_widens() {
        let string_col = ColumnSchema::new("title", ColumnType::String);
        assert_eq!(
            normalize_cell(&string_col, &Cell::Bytes(b"hello".to_vec())),
            Value::String("hello".into())
        );

        let float_col = ColumnSchema::new("score", ColumnType::Float);
        assert_eq!(normalize_cell(&float_col, &Cell::Int(3)), Value::from(3.0));
    }

    #[test]
    fn dump_strings_pass_through_enum_columns() {
        // Dump output carries enums as their label already.
        let column = ColumnSchema::new("status", ColumnType::Enum(vec!["on".into()]));
        assert_eq!(
            normalize_cell(&column, &Cell::String("on".into())),
            Value::String("on".into())
        );
    }
}
