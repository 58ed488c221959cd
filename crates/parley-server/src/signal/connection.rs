//! Per-client connection handle.
//!
//! A [`Connection`] is what the registry maps identifiers to and what the
//! router emits through. The transport owns the socket; the handle only holds
//! the sending half of the outbound queue, so it never keeps a socket alive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use parley_core::{Identifier, ServerEvent};
use tokio::sync::mpsc;

/// Lifecycle of a connection as seen by the router.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, no identifier yet.
    Unidentified,
    /// Identifier assigned and registered.
    Identified,
    /// Disconnected. Terminal.
    Gone,
}

/// A connected client.
pub struct Connection {
    /// Transport-level connection ID (`conn_<uuid>`), used in logs.
    pub id: String,
    identifier: Mutex<Option<Identifier>>,
    gone: AtomicBool,
    tx: mpsc::Sender<ServerEvent>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has shown activity since the last heartbeat check.
    pub is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    /// Events dropped because the outbound queue was full or closed.
    pub dropped_messages: AtomicU64,
}

impl Connection {
    /// Create a handle around the outbound queue.
    pub fn new(id: String, tx: mpsc::Sender<ServerEvent>) -> Self {
        let now = Instant::now();
        Self {
            id,
            identifier: Mutex::new(None),
            gone: AtomicBool::new(false),
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// The assigned identifier, if any.
    pub fn identifier(&self) -> Option<Identifier> {
        self.identifier.lock().clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        if self.gone.load(Ordering::Acquire) {
            ConnectionState::Gone
        } else if self.identifier.lock().is_some() {
            ConnectionState::Identified
        } else {
            ConnectionState::Unidentified
        }
    }

    /// Record the assigned identifier.
    ///
    /// Succeeds only once, and only before the connection is gone.
    pub fn assign(&self, id: Identifier) -> bool {
        let mut slot = self.identifier.lock();
        if slot.is_some() || self.gone.load(Ordering::Acquire) {
            return false;
        }
        *slot = Some(id);
        true
    }

    /// Move to [`ConnectionState::Gone`].
    ///
    /// Returns the identifier to release on the first call, `None` after.
    pub fn mark_gone(&self) -> Option<Identifier> {
        // Hold the identifier lock so a concurrent assign sees the flag.
        let slot = self.identifier.lock();
        if self.gone.swap(true, Ordering::AcqRel) {
            return None;
        }
        slot.clone()
    }

    /// Queue an event for the client without waiting.
    ///
    /// Returns `false` if the queue is full or closed and counts the drop.
    pub fn emit(&self, event: ServerEvent) -> bool {
        if self.tx.try_send(event).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total events dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record client activity.
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Read and reset the activity flag.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("identifier", &self.identifier())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
