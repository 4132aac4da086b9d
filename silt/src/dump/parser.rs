use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::error::{Error, SiltResult};
use crate::types::Cell;

static BINLOG_EXP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^CHANGE MASTER TO MASTER_LOG_FILE='(.+)', MASTER_LOG_POS=(\d+);").unwrap()
});
static USE_EXP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^USE `(.+)`;").unwrap());
static INSERT_WITH_VALUES_EXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^INSERT INTO `(.+?)` VALUES \((.+)\);").unwrap());
static INSERT_EXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^INSERT INTO `(.+?)` VALUES").unwrap());
static VALUES_EXP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\((.+)\)[;,]").unwrap());

/// Consumer of the parsed dump stream.
///
/// The `CHANGE MASTER TO` record arrives through [`DumpHandler::binlog_position`];
/// it marks the binlog coordinate at which the dump is consistent, so the rest
/// of the pipeline can treat the dump as a stream prefix.
pub trait DumpHandler {
    fn binlog_position(
        &mut self,
        file: &str,
        pos: u64,
    ) -> impl Future<Output = SiltResult<()>> + Send;

    fn row(
        &mut self,
        schema: &str,
        table: &str,
        values: Vec<Cell>,
    ) -> impl Future<Output = SiltResult<()>> + Send;
}

/// Parser state carried across input segments.
///
/// The parallel dumper writes one file per table; the driver seeds the
/// database between files and keeps the checkpoint flag across them.
#[derive(Debug, Default)]
pub struct ParserState {
    current_db: String,
    current_insert_table: String,
    binlog_parsed: bool,
}

impl ParserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the database context, used when the dump output carries no
    /// `USE` statement of its own.
    pub fn with_database(db: &str) -> Self {
        Self {
            current_db: db.to_string(),
            ..Self::default()
        }
    }

    pub fn set_database(&mut self, db: &str) {
        db.clone_into(&mut self.current_db);
    }
}

/// Parses one dump text segment line by line.
///
/// Recognized lines: the `CHANGE MASTER TO` checkpoint (once), `USE`
/// statements, single-line `INSERT INTO ... VALUES (...);` statements, and
/// multi-line insert blocks where the values follow on their own lines.
/// A row that fails to parse aborts with an error; silently skipping rows
/// would leave the sink incomplete with no trace.
pub async fn parse_stream<R, H>(
    state: &mut ParserState,
    reader: R,
    handler: &mut H,
) -> SiltResult<()>
where
    R: AsyncBufRead + Unpin,
    H: DumpHandler,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if !state.binlog_parsed
            && let Some(captures) = BINLOG_EXP.captures(&line)
        {
            debug!(line, "parsed dump checkpoint");
            let file = &captures[1];
            let pos: u64 = captures[2]
                .parse()
                .map_err(|_| Error::dump_parse_failed(format!("invalid binlog offset: {line}")))?;
            handler.binlog_position(file, pos).await?;
            state.binlog_parsed = true;
            continue;
        }

        if let Some(captures) = USE_EXP.captures(&line) {
            state.current_db = captures[1].to_string();
        } else if let Some(captures) = INSERT_WITH_VALUES_EXP.captures(&line) {
            let table = captures[1].to_string();
            let values = parse_values(&captures[2])
                .map_err(|reason| Error::dump_parse_failed(format!("{reason}: {line}")))?;
            let db = state.current_db.clone();
            handler.row(&db, &table, values).await?;
        } else if let Some(captures) = INSERT_EXP.captures(&line) {
            state.current_insert_table = captures[1].to_string();
        } else if let Some(captures) = VALUES_EXP.captures(&line) {
            let values = parse_values(&captures[1])
                .map_err(|reason| Error::dump_parse_failed(format!("{reason}: {line}")))?;
            let db = state.current_db.clone();
            let table = state.current_insert_table.clone();
            handler.row(&db, &table, values).await?;
        }
    }

    Ok(())
}

/// Splits the value list of an `INSERT` statement into typed cells.
///
/// Values are separated by commas, but commas may appear inside quoted
/// strings, so this walks the text respecting single/double quotes and
/// backslash escapes. Unquoted tokens are recognized as `NULL` or numeric
/// literals.
pub fn parse_values(text: &str) -> Result<Vec<Cell>, String> {
    let bytes = text.as_bytes();
    let mut values = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let first = bytes[i];
        if first != b'\'' && first != b'"' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j] != b',' {
                j += 1;
            }
            values.push(unquoted_cell(text[i..j].trim()));
            i = j + 1;
        } else {
            let mut j = i + 1;
            let mut value = String::new();
            loop {
                if j >= bytes.len() {
                    return Err("unterminated quoted value".to_string());
                }
                if bytes[j] == b'\\' {
                    if j + 1 >= bytes.len() {
                        return Err("dangling escape in quoted value".to_string());
                    }
                    value.push(unescape(bytes[j + 1]));
                    j += 2;
                } else if bytes[j] == first {
                    break;
                } else {
                    // Quoted content is the dump tool's textual rendering and
                    // is assumed valid UTF-8.
                    let c = text[j..].chars().next().unwrap_or('\u{fffd}');
                    value.push(c);
                    j += c.len_utf8();
                }
            }
            values.push(Cell::String(value));
            // skip the closing quote and the comma
            i = j + 2;
        }
    }

    Ok(values)
}

fn unquoted_cell(token: &str) -> Cell {
    if token.eq_ignore_ascii_case("NULL") {
        return Cell::Null;
    }
    if let Ok(v) = token.parse::<i64>() {
        return Cell::Int(v);
    }
    if let Ok(v) = token.parse::<u64>() {
        return Cell::UInt(v);
    }
    if let Ok(v) = token.parse::<f64>() {
        return Cell::Float(v);
    }
    Cell::String(token.to_string())
}

fn unescape(escaped: u8) -> char {
    match escaped {
        b'n' => '\n',
        b't' => '\t',
        b'r' => '\r',
        b'0' => '\0',
        b'Z' => '\u{1a}',
        other => other as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_unquoted_values() {
        let values = parse_values("1,2.5,NULL,abc").unwrap();
        assert_eq!(
            values,
            vec![
                Cell::Int(1),
                Cell::Float(2.5),
                Cell::Null,
                Cell::String("abc".into())
            ]
        );
    }

    #[test]
    fn respects_quotes_and_escapes() {
        let values = parse_values(r#"1,'it','a,b','say \"hi\"','line\nbreak'"#).unwrap();
        assert_eq!(values[1], Cell::String("it".into()));
        assert_eq!(values[2], Cell::String("a,b".into()));
        assert_eq!(values[3], Cell::String("say \"hi\"".into()));
        assert_eq!(values[4], Cell::String("line\nbreak".into()));
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert!(parse_values("'oops").is_err());
    }
}
