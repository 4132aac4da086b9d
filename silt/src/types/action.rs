use std::fmt;

use serde_json::{Map, Value};

/// Document body: field name to JSON value, in column order.
pub type DocumentBody = Map<String, Value>;

/// Routing metadata shared by all action kinds.
///
/// `parent` is empty when the rule has no parent column configured; when set
/// it doubles as the sink routing key so children co-locate with parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMeta {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub parent: String,
}

/// One index mutation produced by the converter.
///
/// Each action carries a pre-computed byte hint for its serialized body so
/// the bulker can enforce its size threshold without re-serializing.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Index a full document, replacing any previous version.
    Index {
        meta: ActionMeta,
        body: DocumentBody,
        size_hint_bytes: usize,
    },
    /// Partially update an existing document with only the changed fields.
    Update {
        meta: ActionMeta,
        partial_body: DocumentBody,
        size_hint_bytes: usize,
    },
    /// Delete a document.
    Delete { meta: ActionMeta },
}

/// Lightweight classification of an [`Action`], for statistics and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Index,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl Action {
    pub fn index(meta: ActionMeta, body: DocumentBody) -> Self {
        let size_hint_bytes = estimate_body_bytes(&body);
        Self::Index {
            meta,
            body,
            size_hint_bytes,
        }
    }

    pub fn update(meta: ActionMeta, partial_body: DocumentBody) -> Self {
        let size_hint_bytes = estimate_body_bytes(&partial_body);
        Self::Update {
            meta,
            partial_body,
            size_hint_bytes,
        }
    }

    pub fn delete(meta: ActionMeta) -> Self {
        Self::Delete { meta }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Index { .. } => ActionKind::Index,
            Self::Update { .. } => ActionKind::Update,
            Self::Delete { .. } => ActionKind::Delete,
        }
    }

    pub fn meta(&self) -> &ActionMeta {
        match self {
            Self::Index { meta, .. } | Self::Update { meta, .. } | Self::Delete { meta } => meta,
        }
    }

    /// Approximate serialized size, used by the bulker's byte threshold.
    pub fn size_hint(&self) -> usize {
        match self {
            Self::Index {
                size_hint_bytes, ..
            }
            | Self::Update {
                size_hint_bytes, ..
            } => *size_hint_bytes,
            // Metadata-only line.
            Self::Delete { meta } => meta.index.len() + meta.id.len() + 32,
        }
    }
}

fn estimate_body_bytes(body: &DocumentBody) -> usize {
    serde_json::to_vec(body).map(|v| v.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ActionMeta {
        ActionMeta {
            index: "river".into(),
            doc_type: "river".into(),
            id: "1".into(),
            parent: String::new(),
        }
    }

    #[test]
    fn size_hint_tracks_body() {
        let mut body = DocumentBody::new();
        body.insert("title".into(), Value::String("first".into()));
        let small = Action::index(meta(), body.clone());

        body.insert(
            "content".into(),
            Value::String("a much longer field value".into()),
        );
        let large = Action::index(meta(), body);

        assert!(small.size_hint() > 0);
        assert!(large.size_hint() > small.size_hint());
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            Action::delete(meta()).kind(),
            ActionKind::Delete
        );
        assert_eq!(
            Action::index(meta(), DocumentBody::new()).kind(),
            ActionKind::Index
        );
    }
}
