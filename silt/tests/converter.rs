use std::collections::HashMap;

use serde_json::{Value, json};
use silt::conversion::{convert, doc_id, parent_id};
use silt::error::ErrorKind;
use silt::rules::Rule;
use silt::test_utils::test_table;
use silt::types::{Action, Cell, RowAction, RowEvent};
use silt_mysql::TableSchema;

fn rule_for(table: &TableSchema) -> Rule {
    Rule {
        schema: table.schema.clone(),
        table: table.name.clone(),
        index: "river".to_string(),
        doc_type: "river".to_string(),
        parent: None,
        index_file: None,
        field_mapping: HashMap::new(),
        table_info: table.clone(),
    }
}

fn row(id: i64, title: &str) -> Vec<Cell> {
    vec![
        Cell::Int(id),
        Cell::String(title.to_string()),
        Cell::String("body".to_string()),
        Cell::Int(1),
        Cell::Int(0b011),
        Cell::Int(7),
    ]
}

#[test]
fn insert_emits_full_documents() {
    let table = test_table("test", "posts");
    let rule = rule_for(&table);

    let event = RowEvent::new(
        "test",
        "posts",
        RowAction::Insert,
        vec![row(1, "1st"), row(2, "2nd")],
    );
    let actions = convert(&rule, &table, &event).unwrap();

    assert_eq!(actions.len(), 2);
    let Action::Index { meta, body, .. } = &actions[0] else {
        panic!("expected index action, got {:?}", actions[0]);
    };
    assert_eq!(meta.id, "1");
    assert_eq!(meta.index, "river");
    assert_eq!(body["title"], "1st");
    assert_eq!(body["kind"], "e1");
    assert_eq!(body["tags"], "a,b");
}

#[test]
fn delete_emits_tombstones() {
    let table = test_table("test", "posts");
    let rule = rule_for(&table);

    let event = RowEvent::new("test", "posts", RowAction::Delete, vec![row(1, "1st")]);
    let actions = convert(&rule, &table, &event).unwrap();

    assert_eq!(actions.len(), 1);
    let Action::Delete { meta } = &actions[0] else {
        panic!("expected delete action, got {:?}", actions[0]);
    };
    assert_eq!(meta.id, "1");
}

#[test]
fn in_place_update_carries_only_changed_fields() {
    let table = test_table("test", "posts");
    let rule = rule_for(&table);

    let before = row(1, "1st");
    let after = row(1, "1st-prime");
    let event = RowEvent::new("test", "posts", RowAction::Update, vec![before, after]);
    let actions = convert(&rule, &table, &event).unwrap();

    assert_eq!(actions.len(), 1);
    let Action::Update { meta, partial_body, .. } = &actions[0] else {
        panic!("expected partial update, got {:?}", actions[0]);
    };
    assert_eq!(meta.id, "1");
    assert_eq!(
        Value::Object(partial_body.clone()),
        json!({ "title": "1st-prime" })
    );
}

#[test]
fn primary_key_change_becomes_delete_then_index() {
    let table = test_table("test", "posts");
    let rule = rule_for(&table);

    let before = row(3, "3rd");
    let after = row(30, "3rd");
    let event = RowEvent::new("test", "posts", RowAction::Update, vec![before, after]);
    let actions = convert(&rule, &table, &event).unwrap();

    assert_eq!(actions.len(), 2);
    let Action::Delete { meta } = &actions[0] else {
        panic!("expected leading delete, got {:?}", actions[0]);
    };
    assert_eq!(meta.id, "3");
    let Action::Index { meta, body, .. } = &actions[1] else {
        panic!("expected trailing index, got {:?}", actions[1]);
    };
    assert_eq!(meta.id, "30");
    assert_eq!(body["title"], "3rd");
}

#[test]
fn parent_change_also_reindexes() {
    let table = test_table("test", "posts");
    let mut rule = rule_for(&table);
    rule.parent = Some("pid".to_string());

    let before = row(1, "1st");
    let mut after = row(1, "1st");
    after[5] = Cell::Int(8);
    let event = RowEvent::new("test", "posts", RowAction::Update, vec![before, after]);
    let actions = convert(&rule, &table, &event).unwrap();

    assert_eq!(actions.len(), 2);
    let Action::Delete { meta } = &actions[0] else {
        panic!("expected delete, got {:?}", actions[0]);
    };
    assert_eq!(meta.parent, "7");
    let Action::Index { meta, .. } = &actions[1] else {
        panic!("expected index, got {:?}", actions[1]);
    };
    assert_eq!(meta.parent, "8");
}

#[test]
fn odd_update_rows_are_a_malformed_event() {
    let table = test_table("test", "posts");
    let rule = rule_for(&table);

    let event = RowEvent::new("test", "posts", RowAction::Update, vec![row(1, "1st")]);
    let err = convert(&rule, &table, &event).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MalformedRowEvent { .. }));
}

#[test]
fn after_only_columns_are_included_in_partial_updates() {
    let mut table = test_table("test", "posts");
    let rule = rule_for(&table);
    table.add_column("new", "VARCHAR(256)");

    let before = row(1, "1st");
    let mut after = row(1, "1st");
    after.push(Cell::String("set".to_string()));
    let event = RowEvent::new("test", "posts", RowAction::Update, vec![before, after]);
    let actions = convert(&rule, &table, &event).unwrap();

    let Action::Update { partial_body, .. } = &actions[0] else {
        panic!("expected partial update, got {:?}", actions[0]);
    };
    assert_eq!(
        Value::Object(partial_body.clone()),
        json!({ "new": "set" })
    );
}

#[test]
fn update_rows_longer_than_the_schema_are_tolerated() {
    let table = test_table("test", "posts");
    let rule = rule_for(&table);

    // The row carries a column the cached schema does not know about yet.
    let mut before = row(1, "1st");
    before.push(Cell::String("x".to_string()));
    let mut after = row(1, "1st");
    after.push(Cell::String("y".to_string()));
    let event = RowEvent::new("test", "posts", RowAction::Update, vec![before, after]);

    let actions = convert(&rule, &table, &event).unwrap();
    let Action::Update { partial_body, .. } = &actions[0] else {
        panic!("expected partial update, got {:?}", actions[0]);
    };
    // The unknown trailing cell has no column name, so nothing is emitted.
    assert!(partial_body.is_empty());
}

#[test]
fn field_mapping_renames_and_coerces_lists() {
    let table = test_table("test", "posts");
    let mut rule = rule_for(&table);
    rule.field_mapping
        .insert("title".to_string(), "es_title".to_string());
    rule.field_mapping
        .insert("content".to_string(), ",list".to_string());

    let mut r = row(1, "1st");
    r[2] = Cell::String("a,b,c".to_string());
    let event = RowEvent::new("test", "posts", RowAction::Insert, vec![r]);
    let actions = convert(&rule, &table, &event).unwrap();

    let Action::Index { body, .. } = &actions[0] else {
        panic!("expected index action, got {:?}", actions[0]);
    };
    assert_eq!(body["es_title"], "1st");
    assert!(body.get("title").is_none());
    assert_eq!(body["content"], json!(["a", "b", "c"]));
}

#[test]
fn null_primary_key_is_an_error() {
    let table = test_table("test", "posts");
    let mut r = row(1, "1st");
    r[0] = Cell::Null;
    assert!(doc_id(&table, &r).is_err());
}

#[test]
fn parent_id_defaults_to_empty_without_parent_column() {
    let table = test_table("test", "posts");
    let rule = rule_for(&table);
    assert_eq!(parent_id(&rule, &table, &row(1, "x")).unwrap(), "");
}

#[test]
fn enum_and_float_normalization_apply_to_documents() {
    let table = test_table("test", "posts");
    let rule = rule_for(&table);

    let mut r = row(9, "t");
    r[3] = Cell::Int(99);
    let event = RowEvent::new("test", "posts", RowAction::Insert, vec![r]);
    let actions = convert(&rule, &table, &event).unwrap();

    let Action::Index { body, .. } = &actions[0] else {
        panic!("expected index action, got {:?}", actions[0]);
    };
    // Out-of-range enum ordinals degrade to the empty string.
    assert_eq!(body["kind"], "");
}
