use silt::dump::{DumpHandler, ParserState, parse_stream};
use silt::error::SiltResult;
use silt::types::Cell;
use silt_telemetry::tracing::init_test_tracing;

#[derive(Debug, Default)]
struct RecordingHandler {
    checkpoint: Option<(String, u64)>,
    rows: Vec<(String, String, Vec<Cell>)>,
}

impl DumpHandler for RecordingHandler {
    async fn binlog_position(&mut self, file: &str, pos: u64) -> SiltResult<()> {
        self.checkpoint = Some((file.to_string(), pos));
        Ok(())
    }

    async fn row(&mut self, schema: &str, table: &str, values: Vec<Cell>) -> SiltResult<()> {
        self.rows
            .push((schema.to_string(), table.to_string(), values));
        Ok(())
    }
}

const MYSQLDUMP_OUTPUT: &str = "\
CHANGE MASTER TO MASTER_LOG_FILE='mysql-bin.000002', MASTER_LOG_POS=1234;
USE `test`;
INSERT INTO `posts` VALUES (1,'1st');
INSERT INTO `posts` VALUES (2,'2nd, with a comma');
INSERT INTO `posts` VALUES (3,NULL);
";

#[tokio::test]
async fn parses_sequential_dump_output() {
    init_test_tracing();

    let mut state = ParserState::new();
    let mut handler = RecordingHandler::default();
    parse_stream(&mut state, MYSQLDUMP_OUTPUT.as_bytes(), &mut handler)
        .await
        .unwrap();

    assert_eq!(
        handler.checkpoint,
        Some(("mysql-bin.000002".to_string(), 1234))
    );
    assert_eq!(handler.rows.len(), 3);

    let (schema, table, values) = &handler.rows[0];
    assert_eq!(schema, "test");
    assert_eq!(table, "posts");
    assert_eq!(values, &vec![Cell::Int(1), Cell::String("1st".into())]);

    assert_eq!(
        handler.rows[1].2[1],
        Cell::String("2nd, with a comma".into())
    );
    assert_eq!(handler.rows[2].2[1], Cell::Null);
}

const MYDUMPER_FILE: &str = "\
INSERT INTO `posts` VALUES
(1,'1st'),
(2,'2nd');
";

#[tokio::test]
async fn parses_parallel_dump_value_blocks() {
    init_test_tracing();

    let mut state = ParserState::with_database("test");
    let mut handler = RecordingHandler::default();
    parse_stream(&mut state, MYDUMPER_FILE.as_bytes(), &mut handler)
        .await
        .unwrap();

    assert_eq!(handler.rows.len(), 2);
    assert_eq!(handler.rows[0].0, "test");
    assert_eq!(handler.rows[0].1, "posts");
    assert_eq!(handler.rows[1].2[0], Cell::Int(2));
}

#[tokio::test]
async fn database_context_survives_across_segments() {
    init_test_tracing();

    let mut state = ParserState::new();
    let mut handler = RecordingHandler::default();

    parse_stream(&mut state, "USE `db1`;\n".as_bytes(), &mut handler)
        .await
        .unwrap();
    parse_stream(
        &mut state,
        "INSERT INTO `t` VALUES (7,'x');\n".as_bytes(),
        &mut handler,
    )
    .await
    .unwrap();

    assert_eq!(handler.rows[0].0, "db1");
}

#[tokio::test]
async fn malformed_rows_abort_parsing() {
    init_test_tracing();

    let mut state = ParserState::new();
    let mut handler = RecordingHandler::default();
    let result = parse_stream(
        &mut state,
        "INSERT INTO `t` VALUES ('unterminated);\n".as_bytes(),
        &mut handler,
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn escaped_quotes_inside_values_are_preserved() {
    init_test_tracing();

    let mut state = ParserState::new();
    let mut handler = RecordingHandler::default();
    parse_stream(
        &mut state,
        r"INSERT INTO `t` VALUES (1,'O\'Brien','tab\there');
"
        .as_bytes(),
        &mut handler,
    )
    .await
    .unwrap();

    assert_eq!(handler.rows[0].2[1], Cell::String("O'Brien".into()));
    assert_eq!(handler.rows[0].2[2], Cell::String("tab\there".into()));
}
