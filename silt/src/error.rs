use std::{error, fmt, result};

/// Type alias for convenience when using the Result type with our Error.
pub type SiltResult<T> = result::Result<T, Error>;

/// Internal error representation with kind and optional source error.
///
/// Uses boxing to keep the public Error type size consistent and enable
/// rich error context without performance penalties for the success path.
struct ErrorInner {
    kind: ErrorKind,
    source: Option<Box<dyn error::Error + Send + Sync>>,
}

/// Error classification for replication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Source database connection failure.
    ConnectionFailed { host: String, port: u16 },
    /// SQL query execution failure.
    QueryExecutionFailed { query: String },
    /// A required source server setting has the wrong value.
    ReplicaConfigInvalid {
        variable: String,
        expected: String,
        actual: String,
    },
    /// Binlog stream read or decode failure.
    BinlogStreamFailed,
    /// Binlog stream ended without a shutdown request.
    BinlogStreamEnded,

    /// Malformed source declaration in the configuration.
    SourceConfigInvalid { reason: String },
    /// Malformed or unresolvable rule override.
    RuleInvalid {
        schema: String,
        table: String,
        reason: String,
    },
    /// A resolved table does not have exactly one primary-key column.
    PrimaryKeyInvalid {
        schema: String,
        table: String,
        count: usize,
    },
    /// Table not found in the source catalog.
    TableNotFound { schema: String, table: String },
    /// Column not found in a table schema.
    ColumnNotFound { table: String, column: String },

    /// A row event that violates the stream contract, e.g. an odd number of
    /// update row images.
    MalformedRowEvent { reason: String },
    /// A primary-key cell was NULL and no document id could be derived.
    NullPrimaryKey { table: String },

    /// External dump tool spawn or exit failure.
    DumpFailed { reason: String },
    /// Unparseable dump output.
    DumpParseFailed { reason: String },

    /// Bulk submission transport failure.
    DestinationBulkFailed,
    /// Index existence check or creation failure.
    IndexOperationFailed { index: String },

    /// Position file read or write failure.
    PositionStoreFailed { path: String },

    /// A spawned pipeline task panicked.
    WorkerPanicked,

    /// Configuration parsing or validation failure.
    ConfigurationError { parameter: String, reason: String },
    /// JSON serialization failure.
    JsonSerializationFailed,
    /// I/O operation failure.
    IoError,
    /// Error that doesn't fit other categories.
    Other { description: String },
}

/// A stable error type for the silt library.
///
/// Provides a stable public API while allowing internal error details to
/// evolve; supports error chaining and classification.
pub struct Error(Box<ErrorInner>);

impl Error {
    /// Creates a new error with the specified kind.
    pub fn new(kind: ErrorKind) -> Self {
        Error(Box::new(ErrorInner { kind, source: None }))
    }

    /// Creates a new error with the specified kind and source error.
    pub fn with_source<E>(kind: ErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error(Box::new(ErrorInner {
            kind,
            source: Some(source.into()),
        }))
    }

    pub fn table_not_found(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(ErrorKind::TableNotFound {
            schema: schema.into(),
            table: table.into(),
        })
    }

    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(ErrorKind::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        })
    }

    pub fn rule_invalid(
        schema: impl Into<String>,
        table: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::RuleInvalid {
            schema: schema.into(),
            table: table.into(),
            reason: reason.into(),
        })
    }

    pub fn source_config_invalid(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceConfigInvalid {
            reason: reason.into(),
        })
    }

    pub fn malformed_row_event(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedRowEvent {
            reason: reason.into(),
        })
    }

    pub fn dump_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::DumpFailed {
            reason: reason.into(),
        })
    }

    pub fn dump_parse_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::DumpParseFailed {
            reason: reason.into(),
        })
    }

    pub fn configuration(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError {
            parameter: parameter.into(),
            reason: reason.into(),
        })
    }

    pub fn other(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other {
            description: description.into(),
        })
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }

    /// Returns true for errors that indicate a misconfiguration rather than
    /// an environmental or transient failure; these abort startup and are not
    /// worth restarting into.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.0.kind,
            ErrorKind::SourceConfigInvalid { .. }
                | ErrorKind::RuleInvalid { .. }
                | ErrorKind::PrimaryKeyInvalid { .. }
                | ErrorKind::ConfigurationError { .. }
        )
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.0.kind)
            .field("source", &self.0.source)
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;

        match &self.0.kind {
            ConnectionFailed { host, port } => {
                write!(f, "failed to connect to source at {host}:{port}")
            }
            QueryExecutionFailed { query } => {
                write!(f, "query execution failed: {query}")
            }
            ReplicaConfigInvalid {
                variable,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "source variable '{variable}' must be '{expected}', found '{actual}'"
                )
            }
            BinlogStreamFailed => write!(f, "binlog stream processing failed"),
            BinlogStreamEnded => write!(f, "binlog stream ended unexpectedly"),

            SourceConfigInvalid { reason } => {
                write!(f, "invalid source declaration: {reason}")
            }
            RuleInvalid {
                schema,
                table,
                reason,
            } => {
                write!(f, "invalid rule for {schema}.{table}: {reason}")
            }
            PrimaryKeyInvalid {
                schema,
                table,
                count,
            } => {
                write!(
                    f,
                    "{schema}.{table} must have a single-column primary key, found {count}"
                )
            }
            TableNotFound { schema, table } => {
                write!(f, "table '{schema}.{table}' not found")
            }
            ColumnNotFound { table, column } => {
                write!(f, "column '{column}' not found in table '{table}'")
            }

            MalformedRowEvent { reason } => {
                write!(f, "malformed row event: {reason}")
            }
            NullPrimaryKey { table } => {
                write!(f, "NULL primary key value in table '{table}'")
            }

            DumpFailed { reason } => write!(f, "dump failed: {reason}"),
            DumpParseFailed { reason } => write!(f, "dump parsing failed: {reason}"),

            DestinationBulkFailed => write!(f, "bulk submission to destination failed"),
            IndexOperationFailed { index } => {
                write!(f, "index operation failed for '{index}'")
            }

            PositionStoreFailed { path } => {
                write!(f, "position store operation failed for '{path}'")
            }

            WorkerPanicked => write!(f, "pipeline worker panicked"),

            ConfigurationError { parameter, reason } => {
                write!(
                    f,
                    "configuration error for parameter '{parameter}': {reason}"
                )
            }
            JsonSerializationFailed => write!(f, "json serialization failed"),
            IoError => write!(f, "i/o operation failed"),
            Other { description } => write!(f, "{description}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.0
            .source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn error::Error + 'static))
    }
}

impl From<mysql_async::Error> for Error {
    fn from(err: mysql_async::Error) -> Self {
        match &err {
            mysql_async::Error::Io(_) => Self::with_source(ErrorKind::IoError, err),
            mysql_async::Error::Server(server_err) => {
                let query = server_err.message.clone();
                Self::with_source(ErrorKind::QueryExecutionFailed { query }, err)
            }
            _ => {
                let description = err.to_string();
                Self::with_source(ErrorKind::Other { description }, err)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::IoError, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::JsonSerializationFailed, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_of_configuration_errors() {
        assert!(Error::rule_invalid("s", "t", "nope").is_configuration());
        assert!(Error::source_config_invalid("empty schema").is_configuration());
        assert!(!Error::new(ErrorKind::DestinationBulkFailed).is_configuration());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::new(ErrorKind::PrimaryKeyInvalid {
            schema: "test".into(),
            table: "t".into(),
            count: 2,
        });
        assert_eq!(
            err.to_string(),
            "test.t must have a single-column primary key, found 2"
        );
    }

    #[test]
    fn source_chain_is_preserved() {
        let io = std::io::Error::other("disk on fire");
        let err = Error::with_source(ErrorKind::IoError, io);
        assert!(error::Error::source(&err).is_some());
    }
}
