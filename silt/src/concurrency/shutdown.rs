//! Shutdown signaling for pipeline tasks.
//!
//! Abstracts a tokio watch channel into a pair of shutdown handles. The
//! channel carries a boolean "shutting down" flag so receivers that subscribe
//! late still observe an already-requested shutdown.

use tokio::sync::watch;

/// Transmitter side of the shutdown channel.
pub type ShutdownTx = watch::Sender<bool>;

/// Receiver side of the shutdown channel.
pub type ShutdownRx = watch::Receiver<bool>;

/// Creates a new shutdown channel in the "running" state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    watch::channel(false)
}

/// Returns true once shutdown has been requested on this channel.
pub fn is_shutting_down(rx: &ShutdownRx) -> bool {
    *rx.borrow()
}
