//! Binlog tailing: the replication client, the typed event stream, and the
//! tailer loop that drives the pipeline once the dump phase is over.

mod client;
mod stream;
mod tailer;

pub use client::MySqlReplicationClient;
pub use stream::{TailEvent, TailEventStream, TailSource};
pub use tailer::Tailer;
