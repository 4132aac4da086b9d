//! Recognizer for the subset of replicated DDL the pipeline reacts to.
//!
//! Only `ALTER TABLE ... ADD [COLUMN] <name> <type> [extra]` is acted upon
//! downstream. `MODIFY` and `DROP` are recognized so callers can log them
//! deliberately instead of treating them as noise; every other statement is
//! reported as ignored.

/// The ALTER operation found in a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterOperation {
    Add,
    Modify,
    Drop,
}

/// A parsed `ALTER TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTableStatement {
    /// Schema qualifier, empty when the statement relies on the session schema.
    pub schema: String,
    pub table: String,
    pub operation: AlterOperation,
    pub column: String,
    /// Raw type token, e.g. `VARCHAR(256)`.
    pub column_type: String,
    /// Whatever single token follows the type (`DEFAULT`, `NOT`, ...), upper-cased.
    pub extra: String,
}

/// Outcome of looking at one replicated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedStatement {
    Alter(AlterTableStatement),
    /// Not an `ALTER TABLE` statement at all.
    Ignored,
}

/// Parses a replicated query string.
///
/// Returns `Err` only for statements that start as `ALTER TABLE` but cannot
/// be understood; anything else is `Ok(Ignored)` so the caller can skip it
/// quietly.
pub fn parse_statement(query: &str) -> Result<ParsedStatement, String> {
    let mut tokens = QuotedTokenizer::new(query);

    let Some(first) = tokens.next() else {
        return Ok(ParsedStatement::Ignored);
    };
    if !first.eq_ignore_ascii_case("ALTER") {
        return Ok(ParsedStatement::Ignored);
    }
    match tokens.next() {
        Some(t) if t.eq_ignore_ascii_case("TABLE") => {}
        _ => return Ok(ParsedStatement::Ignored),
    }

    let name = tokens
        .next()
        .ok_or_else(|| format!("missing table name in '{query}'"))?;
    let (schema, table) = split_table_name(&name);

    let op_token = tokens
        .next()
        .ok_or_else(|| format!("missing operation in '{query}'"))?;
    let operation = match op_token.to_uppercase().as_str() {
        "ADD" => AlterOperation::Add,
        "MODIFY" => AlterOperation::Modify,
        "DROP" => AlterOperation::Drop,
        other => return Err(format!("unrecognized ALTER operation '{other}' in '{query}'")),
    };

    let mut column = tokens
        .next()
        .ok_or_else(|| format!("missing column name in '{query}'"))?;
    if column.eq_ignore_ascii_case("COLUMN") {
        column = tokens
            .next()
            .ok_or_else(|| format!("missing column name in '{query}'"))?;
    }
    let column = strip_quotes(&column);
    if column.is_empty() {
        return Err(format!("missing column name in '{query}'"));
    }

    // DROP carries no type.
    let column_type = if operation == AlterOperation::Drop {
        String::new()
    } else {
        let t = tokens
            .next()
            .ok_or_else(|| format!("missing column type in '{query}'"))?;
        t.to_uppercase()
    };

    let extra = tokens.next().map(|t| t.to_uppercase()).unwrap_or_default();

    Ok(ParsedStatement::Alter(AlterTableStatement {
        schema,
        table,
        operation,
        column,
        column_type,
        extra,
    }))
}

/// Splits words on whitespace while keeping back/single/double-quoted spans
/// intact, so quoted identifiers and defaults survive as one token.
struct QuotedTokenizer<'a> {
    rest: &'a str,
}

impl<'a> QuotedTokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }
}

impl Iterator for QuotedTokenizer<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }

        let mut quote: Option<char> = None;
        let mut end = trimmed.len();
        for (i, c) in trimmed.char_indices() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                }
                None => {
                    if is_quote(c) {
                        quote = Some(c);
                    } else if c.is_whitespace() {
                        end = i;
                        break;
                    }
                }
            }
        }

        let token = &trimmed[..end];
        self.rest = &trimmed[end..];
        Some(token.trim_end_matches([',', ';']).to_string())
    }
}

fn is_quote(c: char) -> bool {
    matches!(c, '\'' | '"' | '`')
}

fn strip_quotes(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(q) if is_quote(q) => {
            let rest: String = chars.collect();
            rest.strip_suffix(q).map(str::to_string).unwrap_or(rest)
        }
        _ => token.to_string(),
    }
}

/// Splits `db.table`, `` db.`table` `` or `` `table` `` into (schema, table).
fn split_table_name(name: &str) -> (String, String) {
    match name.split_once('.') {
        Some((db, table)) => (strip_quotes(db), strip_quotes(table)),
        None => (String::new(), strip_quotes(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alter(query: &str) -> AlterTableStatement {
        match parse_statement(query).unwrap() {
            ParsedStatement::Alter(stmt) => stmt,
            other => panic!("expected alter statement, got {other:?}"),
        }
    }

    #[test]
    fn parses_add_column() {
        let stmt = alter("ALTER TABLE test_tbl ADD new_col VARCHAR(256) DEFAULT 'not-set'");
        assert_eq!(stmt.schema, "");
        assert_eq!(stmt.table, "test_tbl");
        assert_eq!(stmt.operation, AlterOperation::Add);
        assert_eq!(stmt.column, "new_col");
        assert_eq!(stmt.column_type, "VARCHAR(256)");
        assert_eq!(stmt.extra, "DEFAULT");
    }

    #[test]
    fn parses_add_with_column_keyword_and_quotes() {
        let stmt = alter("alter table db1.`users` add column `nick` text");
        assert_eq!(stmt.schema, "db1");
        assert_eq!(stmt.table, "users");
        assert_eq!(stmt.column, "nick");
        assert_eq!(stmt.column_type, "TEXT");
    }

    #[test]
    fn recognizes_modify_and_drop() {
        let stmt = alter("ALTER TABLE t MODIFY title VARCHAR(512)");
        assert_eq!(stmt.operation, AlterOperation::Modify);

        let stmt = alter("ALTER TABLE t DROP `title`");
        assert_eq!(stmt.operation, AlterOperation::Drop);
        assert_eq!(stmt.column, "title");
        assert_eq!(stmt.column_type, "");
    }

    #[test]
    fn ignores_non_alter_statements() {
        assert_eq!(
            parse_statement("BEGIN").unwrap(),
            ParsedStatement::Ignored
        );
        assert_eq!(
            parse_statement("CREATE TABLE t (id INT)").unwrap(),
            ParsedStatement::Ignored
        );
        assert_eq!(parse_statement("").unwrap(), ParsedStatement::Ignored);
    }

    #[test]
    fn rejects_malformed_alter() {
        assert!(parse_statement("ALTER TABLE t FROBNICATE x").is_err());
        assert!(parse_statement("ALTER TABLE t ADD").is_err());
    }
}
