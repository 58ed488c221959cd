//! Graceful shutdown via a shared `CancellationToken`.
//!
//! The HTTP listener and every WebSocket session watch the same token, so one
//! [`ShutdownCoordinator::shutdown`] stops accepting, closes sockets and
//! releases every identifier.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default time allowed for tasks to finish after shutdown starts.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the server-wide shutdown signal.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator with a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the token for a task to watch.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been signalled.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown and wait up to `timeout` for `handles` to finish.
    ///
    /// Returns `false` if the timeout elapsed first.
    pub async fn drain(&self, handles: Vec<JoinHandle<()>>, timeout: Duration) -> bool {
        self.shutdown();
        info!(tasks = handles.len(), ?timeout, "draining tasks");

        if tokio::time::timeout(timeout, futures::future::join_all(handles)).await.is_ok() {
            true
        } else {
            warn!(?timeout, "drain timed out, abandoning remaining tasks");
            false
        }
    }
}
