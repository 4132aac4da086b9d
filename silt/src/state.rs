//! Binlog position persistence.
//!
//! The last saved coordinate lives in a small JSON file in the data
//! directory. Writes go through a temp file plus atomic rename so a crash
//! can never leave a torn position behind. Restart replays from the saved
//! coordinate; at-least-once delivery makes the replay safe.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use metrics::counter;
use silt_mysql::BinlogPosition;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Error, ErrorKind, SiltResult};
use crate::metrics::SILT_POSITION_SAVES_TOTAL;

const POSITION_FILE: &str = "position.json";
const TEMP_SUFFIX: &str = ".tmp";

/// Heartbeat cadence for unforced saves.
const SAVE_INTERVAL: Duration = Duration::from_secs(1);

/// File-backed store for the last saved position.
#[derive(Debug)]
pub struct PositionStore {
    path: PathBuf,
}

impl PositionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(POSITION_FILE),
        }
    }

    fn store_error(&self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
        Error::with_source(
            ErrorKind::PositionStoreFailed {
                path: self.path.display().to_string(),
            },
            source,
        )
    }

    /// Loads the saved position; `None` when no position was ever saved.
    pub async fn load(&self) -> SiltResult<Option<BinlogPosition>> {
        match fs::read(&self.path).await {
            Ok(bytes) => {
                let position =
                    serde_json::from_slice(&bytes).map_err(|e| self.store_error(e))?;
                Ok(Some(position))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.store_error(e)),
        }
    }

    /// Atomically replaces the saved position.
    pub async fn save(&self, position: &BinlogPosition) -> SiltResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.store_error(e))?;
        }

        let bytes = serde_json::to_vec_pretty(position)?;
        let temp_path = self.path.with_extension(format!("json{TEMP_SUFFIX}"));
        fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| self.store_error(e))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.store_error(e))?;

        Ok(())
    }
}

/// In-memory position plus throttled persistence.
///
/// Written only from the tailer task (and the dump phase before it starts);
/// read at restart only.
#[derive(Debug)]
pub struct PositionTracker {
    store: PositionStore,
    current: Option<BinlogPosition>,
    last_saved_at: Option<Instant>,
}

impl PositionTracker {
    /// Opens the store and loads any previously saved position.
    pub async fn load(data_dir: &Path) -> SiltResult<Self> {
        let store = PositionStore::new(data_dir);
        let current = store.load().await?;
        if let Some(position) = &current {
            info!(%position, "resuming from saved position");
        }

        Ok(Self {
            store,
            current,
            last_saved_at: None,
        })
    }

    pub fn current(&self) -> Option<&BinlogPosition> {
        self.current.as_ref()
    }

    /// Adopts a full coordinate, e.g. the dump checkpoint or a rotate target.
    pub fn reset(&mut self, position: BinlogPosition) {
        self.current = Some(position);
    }

    /// Advances the offset within the current logfile.
    ///
    /// Offsets only move forward; replayed or out-of-band events never move
    /// the persisted position backwards within a file.
    pub fn update_offset(&mut self, offset: u64) {
        if let Some(position) = &mut self.current
            && offset > position.offset
        {
            position.offset = offset;
        }
    }

    /// Persists the current position.
    ///
    /// Unforced saves are throttled to the heartbeat cadence; forced saves
    /// (rotate, shutdown, dump completion) always hit the disk.
    pub async fn save(&mut self, force: bool) -> SiltResult<()> {
        let Some(position) = &self.current else {
            return Ok(());
        };

        if !force
            && let Some(last) = self.last_saved_at
            && last.elapsed() < SAVE_INTERVAL
        {
            return Ok(());
        }

        debug!(position = %position, force, "saving position");
        self.store.save(position).await?;
        self.last_saved_at = Some(Instant::now());
        counter!(SILT_POSITION_SAVES_TOTAL).increment(1);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_returns_none_for_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::new(dir.path());
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::new(dir.path());

        let position = BinlogPosition::new("mysql-bin.000003", 1234);
        store.save(&position).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(position));
    }

    #[tokio::test]
    async fn tracker_offset_is_monotonic_within_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = PositionTracker::load(dir.path()).await.unwrap();

        tracker.reset(BinlogPosition::new("mysql-bin.000001", 100));
        tracker.update_offset(400);
        tracker.update_offset(200);
        assert_eq!(tracker.current().unwrap().offset, 400);

        tracker.save(true).await.unwrap();
        let reloaded = PositionStore::new(dir.path()).load().await.unwrap();
        assert_eq!(reloaded, Some(BinlogPosition::new("mysql-bin.000001", 400)));
    }

    #[tokio::test]
    async fn unforced_saves_are_throttled() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = PositionTracker::load(dir.path()).await.unwrap();

        tracker.reset(BinlogPosition::new("mysql-bin.000001", 100));
        tracker.save(false).await.unwrap();

        tracker.update_offset(500);
        tracker.save(false).await.unwrap();

        // The second save happened inside the heartbeat interval, so the
        // stored position still carries the first offset.
        let reloaded = PositionStore::new(dir.path()).load().await.unwrap();
        assert_eq!(reloaded, Some(BinlogPosition::new("mysql-bin.000001", 100)));
    }
}
