use std::fmt;

use crate::types::Cell;

/// The DML action a row event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A unit of change from the source: one DML action and its affected row
/// images.
///
/// For [`RowAction::Insert`] and [`RowAction::Delete`] there is one image per
/// affected row. For [`RowAction::Update`] images come in before/after pairs,
/// so the list length must be even.
#[derive(Debug, Clone)]
pub struct RowEvent {
    pub schema: String,
    pub table: String,
    pub action: RowAction,
    pub rows: Vec<Vec<Cell>>,
}

impl RowEvent {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        action: RowAction,
        rows: Vec<Vec<Cell>>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            action,
            rows,
        }
    }
}
