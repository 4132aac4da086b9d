use std::future::Future;

use futures::StreamExt;
use mysql_async::BinlogStream;
use mysql_async::Value;
use mysql_async::binlog::events::{EventData, RowsEventData};
use mysql_async::binlog::row::BinlogRow;
use mysql_async::binlog::value::BinlogValue;
use silt_mysql::BinlogPosition;
use tracing::debug;

use crate::error::{Error, ErrorKind, SiltResult};
use crate::types::{Cell, RowAction};

/// A typed event out of the binlog, reduced to what the tailer reacts to.
///
/// `next_offset` is the position immediately after the event in the current
/// logfile, taken from the event header.
#[derive(Debug, Clone)]
pub enum TailEvent {
    /// The stream moved to a new logfile.
    Rotate { position: BinlogPosition },
    /// A decoded row-change event.
    Rows {
        schema: String,
        table: String,
        action: RowAction,
        /// Row images; update events carry interleaved before/after pairs.
        rows: Vec<Vec<Cell>>,
        next_offset: u64,
    },
    /// A statement replicated in the stream, DDL included.
    Query {
        schema: String,
        query: String,
        next_offset: u64,
    },
    /// Anything else; only advances the position.
    Other { next_offset: u64 },
}

/// Source of tail events, abstracted so the tailer can be driven by scripted
/// streams in tests.
pub trait TailSource {
    /// Returns the next event, `None` when the stream is exhausted.
    fn next_event(&mut self) -> impl Future<Output = Option<SiltResult<TailEvent>>> + Send;
}

/// Adapts the driver's raw binlog stream into [`TailEvent`]s.
///
/// Row images are decoded against the table-map events the stream has seen;
/// a rows event without its table map cannot be decoded and is passed through
/// as [`TailEvent::Other`].
pub struct TailEventStream {
    inner: BinlogStream,
}

impl TailEventStream {
    pub fn new(inner: BinlogStream) -> Self {
        Self { inner }
    }

    fn map_event(&self, event: &mysql_async::binlog::events::Event) -> SiltResult<TailEvent> {
        let next_offset = u64::from(event.header().log_pos());

        let data = event
            .read_data()
            .map_err(|e| Error::with_source(ErrorKind::BinlogStreamFailed, e))?;

        match data {
            Some(EventData::RotateEvent(rotate)) => Ok(TailEvent::Rotate {
                position: BinlogPosition::new(rotate.name(), rotate.position()),
            }),
            Some(EventData::RowsEvent(rows_data)) => self.map_rows_event(rows_data, next_offset),
            Some(EventData::QueryEvent(query)) => Ok(TailEvent::Query {
                schema: query.schema().into_owned(),
                query: query.query().into_owned(),
                next_offset,
            }),
            _ => Ok(TailEvent::Other { next_offset }),
        }
    }

    fn map_rows_event(
        &self,
        rows_data: RowsEventData<'_>,
        next_offset: u64,
    ) -> SiltResult<TailEvent> {
        let action = match &rows_data {
            RowsEventData::WriteRowsEvent(_) | RowsEventData::WriteRowsEventV1(_) => {
                RowAction::Insert
            }
            RowsEventData::UpdateRowsEvent(_) | RowsEventData::UpdateRowsEventV1(_) => {
                RowAction::Update
            }
            RowsEventData::DeleteRowsEvent(_) | RowsEventData::DeleteRowsEventV1(_) => {
                RowAction::Delete
            }
            _ => {
                debug!("ignoring unsupported rows event subtype");
                return Ok(TailEvent::Other { next_offset });
            }
        };

        let Some(table_map) = self.inner.get_tme(rows_data.table_id()) else {
            debug!(table_id = rows_data.table_id(), "rows event without table map");
            return Ok(TailEvent::Other { next_offset });
        };

        let mut rows = Vec::new();
        for row in rows_data.rows(table_map) {
            let (before, after) =
                row.map_err(|e| Error::with_source(ErrorKind::BinlogStreamFailed, e))?;
            match action {
                RowAction::Insert => {
                    if let Some(after) = after {
                        rows.push(row_cells(after));
                    }
                }
                RowAction::Delete => {
                    if let Some(before) = before {
                        rows.push(row_cells(before));
                    }
                }
                RowAction::Update => {
                    if let (Some(before), Some(after)) = (before, after) {
                        rows.push(row_cells(before));
                        rows.push(row_cells(after));
                    }
                }
            }
        }

        Ok(TailEvent::Rows {
            schema: table_map.database_name().into_owned(),
            table: table_map.table_name().into_owned(),
            action,
            rows,
            next_offset,
        })
    }
}

impl TailSource for TailEventStream {
    async fn next_event(&mut self) -> Option<SiltResult<TailEvent>> {
        let event = match self.inner.next().await? {
            Ok(event) => event,
            Err(e) => {
                return Some(Err(Error::with_source(ErrorKind::BinlogStreamFailed, e)));
            }
        };

        Some(self.map_event(&event))
    }
}

fn row_cells(row: BinlogRow) -> Vec<Cell> {
    row.unwrap().into_iter().map(binlog_value_cell).collect()
}

fn binlog_value_cell(value: BinlogValue<'_>) -> Cell {
    match value {
        BinlogValue::Value(v) => value_cell(v),
        // JSON column payloads and diffs have no cell representation here.
        _ => Cell::Null,
    }
}

fn value_cell(value: Value) -> Cell {
    match value {
        Value::NULL => Cell::Null,
        Value::Int(v) => Cell::Int(v),
        Value::UInt(v) => Cell::UInt(v),
        Value::Float(v) => Cell::Float(f64::from(v)),
        Value::Double(v) => Cell::Float(v),
        Value::Bytes(v) => Cell::Bytes(v),
        Value::Date(year, month, day, hour, minute, second, micro) => {
            if hour == 0 && minute == 0 && second == 0 && micro == 0 {
                Cell::String(format!("{year:04}-{month:02}-{day:02}"))
            } else {
                Cell::String(format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                ))
            }
        }
        Value::Time(negative, days, hours, minutes, seconds, _micro) => {
            let sign = if negative { "-" } else { "" };
            let total_hours = u32::from(days) * 24 + u32::from(hours);
            Cell::String(format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}"))
        }
    }
}
