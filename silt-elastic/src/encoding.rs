use serde_json::{Map, Value, json};

use silt::types::{Action, ActionMeta};

/// Renders a batch of actions as an NDJSON bulk request body.
///
/// Every action contributes a metadata line; index and update actions follow
/// it with a source line. The body ends with a newline as the bulk endpoint
/// requires.
pub fn encode_bulk_body(actions: &[Action]) -> String {
    let mut body = String::new();
    for action in actions {
        match action {
            Action::Index { meta, body: doc, .. } => {
                push_line(&mut body, &meta_line("index", meta));
                push_line(&mut body, &Value::Object(doc.clone()));
            }
            Action::Update {
                meta, partial_body, ..
            } => {
                push_line(&mut body, &meta_line("update", meta));
                push_line(&mut body, &json!({ "doc": Value::Object(partial_body.clone()) }));
            }
            Action::Delete { meta } => {
                push_line(&mut body, &meta_line("delete", meta));
            }
        }
    }
    body
}

fn meta_line(op: &str, meta: &ActionMeta) -> Value {
    let mut fields = Map::new();
    fields.insert("_index".to_string(), Value::String(meta.index.clone()));
    fields.insert("_type".to_string(), Value::String(meta.doc_type.clone()));
    fields.insert("_id".to_string(), Value::String(meta.id.clone()));
    if !meta.parent.is_empty() {
        fields.insert("parent".to_string(), Value::String(meta.parent.clone()));
        fields.insert("routing".to_string(), Value::String(meta.parent.clone()));
    }

    let mut line = Map::new();
    line.insert(op.to_string(), Value::Object(fields));
    Value::Object(line)
}

fn push_line(body: &mut String, line: &Value) {
    body.push_str(&line.to_string());
    body.push('\n');
}

#[cfg(test)]
mod tests {
    use silt::types::DocumentBody;

    use super::*;

    fn meta(id: &str, parent: &str) -> ActionMeta {
        ActionMeta {
            index: "river".into(),
            doc_type: "river".into(),
            id: id.into(),
            parent: parent.into(),
        }
    }

    #[test]
    fn index_action_renders_meta_and_source_lines() {
        let mut doc = DocumentBody::new();
        doc.insert("title".into(), Value::String("1st".into()));
        let body = encode_bulk_body(&[Action::index(meta("1", ""), doc)]);

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);

        let meta_line: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(meta_line["index"]["_index"], "river");
        assert_eq!(meta_line["index"]["_id"], "1");
        assert!(meta_line["index"].get("routing").is_none());

        let source: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(source["title"], "1st");
    }

    #[test]
    fn update_wraps_partial_body_in_doc() {
        let mut partial = DocumentBody::new();
        partial.insert("title".into(), Value::String("1st-prime".into()));
        let body = encode_bulk_body(&[Action::update(meta("1", ""), partial)]);

        let lines: Vec<&str> = body.lines().collect();
        let source: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(source["doc"]["title"], "1st-prime");
    }

    #[test]
    fn delete_with_parent_carries_routing() {
        let body = encode_bulk_body(&[Action::delete(meta("4", "1"))]);

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 1);

        let meta_line: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(meta_line["delete"]["routing"], "1");
        assert_eq!(meta_line["delete"]["parent"], "1");
    }

    #[test]
    fn body_ends_with_newline() {
        let body = encode_bulk_body(&[Action::delete(meta("1", ""))]);
        assert!(body.ends_with('\n'));
    }
}
