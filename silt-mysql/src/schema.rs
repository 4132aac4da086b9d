use std::collections::HashMap;
use std::fmt;

/// Semantic classification of a MySQL column, as far as document conversion
/// cares about it.
///
/// The classification is derived from `information_schema.columns`. Enum and
/// set columns keep their declared value lists in declaration order because
/// row-change events carry them as ordinals and bitmasks respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Bytes,
    Enum(Vec<String>),
    Set(Vec<String>),
    Other,
}

impl ColumnType {
    /// Maps an `information_schema` `DATA_TYPE` / `COLUMN_TYPE` pair to a
    /// semantic column type.
    ///
    /// `column_type` is the full declaration (`enum('a','b')`, `int(11)
    /// unsigned`); it is only consulted for enum and set value lists.
    pub fn from_information_schema(data_type: &str, column_type: &str) -> Self {
        match data_type.to_uppercase().as_str() {
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "BIT"
            | "YEAR" => ColumnType::Integer,
            "FLOAT" | "DOUBLE" | "REAL" | "DECIMAL" | "NUMERIC" => ColumnType::Float,
            "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" => {
                ColumnType::String
            }
            "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                ColumnType::Bytes
            }
            "ENUM" => ColumnType::Enum(parse_value_list(column_type)),
            "SET" => ColumnType::Set(parse_value_list(column_type)),
            _ => ColumnType::Other,
        }
    }

    /// Best-effort mapping from the raw type token of an `ALTER TABLE ... ADD`
    /// statement, where only the declaration text is available.
    pub fn from_declaration(declaration: &str) -> Self {
        let data_type = declaration
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or(declaration);
        Self::from_information_schema(data_type, declaration)
    }
}

/// Extracts `['a', 'b']` from a declaration like `enum('a','b')` or
/// `set('a','b')`. Doubled quotes inside a value are unescaped.
fn parse_value_list(column_type: &str) -> Vec<String> {
    let Some(start) = column_type.find('(') else {
        return Vec::new();
    };
    let Some(end) = column_type.rfind(')') else {
        return Vec::new();
    };

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = column_type[start + 1..end].chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_quote => in_quote = true,
            '\'' if chars.peek() == Some(&'\'') => {
                // escaped quote inside a value
                chars.next();
                current.push('\'');
            }
            '\'' => {
                in_quote = false;
                values.push(std::mem::take(&mut current));
            }
            _ if in_quote => current.push(c),
            _ => {}
        }
    }

    values
}

/// Schema metadata for a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Column-ordered schema for one source table.
///
/// Columns are index-addressed in binlog row order. The schema is created
/// from a catalog query and mutated at runtime only by appending columns when
/// a replicated `ADD COLUMN` statement is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub schema: String,
    pub name: String,
    columns: Vec<ColumnSchema>,
    pk_indices: Vec<usize>,
    index_by_name: HashMap<String, usize>,
}

impl TableSchema {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<ColumnSchema>,
        pk_indices: Vec<usize>,
    ) -> Self {
        let index_by_name = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Self {
            schema: schema.into(),
            name: name.into(),
            columns,
            pk_indices,
            index_by_name,
        }
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Indices of the primary-key columns in declaration order.
    pub fn primary_key_indices(&self) -> &[usize] {
        &self.pk_indices
    }

    /// Index of the single primary-key column, when there is exactly one.
    pub fn single_primary_key(&self) -> Option<usize> {
        match self.pk_indices.as_slice() {
            [index] => Some(*index),
            _ => None,
        }
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    /// Appends a column replicated through an `ADD COLUMN` statement.
    ///
    /// Columns are never removed or reordered at runtime, so the primary-key
    /// indices stay valid.
    pub fn add_column(&mut self, name: impl Into<String>, declaration: &str) {
        let name = name.into();
        let column_type = ColumnType::from_declaration(declaration);
        self.index_by_name
            .insert(name.clone(), self.columns.len());
        self.columns.push(ColumnSchema::new(name, column_type));
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}
