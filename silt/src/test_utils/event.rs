use tokio::sync::mpsc;

use crate::error::SiltResult;
use crate::replication::{TailEvent, TailSource};

/// Test event source fed through a channel.
///
/// Keeping the sender open without sending drives the tailer's idle-timeout
/// path; dropping the sender ends the stream.
#[derive(Debug)]
pub struct ScriptedSource {
    rx: mpsc::UnboundedReceiver<SiltResult<TailEvent>>,
}

/// Creates a scripted source plus its feeding half.
pub fn scripted_source() -> (mpsc::UnboundedSender<SiltResult<TailEvent>>, ScriptedSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ScriptedSource { rx })
}

impl TailSource for ScriptedSource {
    async fn next_event(&mut self) -> Option<SiltResult<TailEvent>> {
        self.rx.recv().await
    }
}
