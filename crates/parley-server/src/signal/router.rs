//! Event routing between connections.
//!
//! Each inbound [`ClientEvent`] produces at most one outbound event, sent
//! either back to the sender or to the addressed peer. Only `call` reports
//! an undeliverable destination (with `failed`); `request` and `end` to an
//! unknown peer are dropped without notice.

use std::sync::Arc;

use metrics::counter;
use parley_core::protocol::Fields;
use parley_core::{ClientEvent, Identifier, ServerEvent};
use tracing::{debug, info, instrument, warn};

use super::connection::{Connection, ConnectionState};
use super::registry::Registry;
use crate::metrics::{SIGNAL_EVENTS_TOTAL, WS_OUTBOUND_DROPS_TOTAL};

/// What the router did with one inbound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Answered the sender (`init`).
    Replied,
    /// Delivered to the addressed peer.
    Forwarded,
    /// Sent `failed` back to the sender.
    Failed,
    /// Nothing was sent.
    Dropped,
    /// The sender is already gone.
    Ignored,
}

impl RouteOutcome {
    /// Metric label value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replied => "replied",
            Self::Forwarded => "forwarded",
            Self::Failed => "failed",
            Self::Dropped => "dropped",
            Self::Ignored => "ignored",
        }
    }
}

/// Routes client events through a shared [`Registry`].
pub struct SignalRouter {
    registry: Arc<Registry>,
}

impl SignalRouter {
    /// Create a router over `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// The registry this router resolves destinations in.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handle one event from `conn`.
    #[instrument(skip_all, fields(conn_id = %conn.id, event = event.name()))]
    pub async fn dispatch(&self, conn: &Arc<Connection>, event: ClientEvent) -> RouteOutcome {
        let name = event.name();
        let outcome = if conn.state() == ConnectionState::Gone {
            RouteOutcome::Ignored
        } else {
            match event {
                ClientEvent::Init => self.init(conn).await,
                ClientEvent::Request { to } => self.request(conn, to.as_deref()),
                ClientEvent::Call { to, fields } => self.call(conn, to.as_deref(), fields),
                ClientEvent::End { to } => self.end(conn, to.as_deref()),
            }
        };
        debug!(outcome = outcome.as_str(), "event routed");
        counter!(SIGNAL_EVENTS_TOTAL, "event" => name, "outcome" => outcome.as_str()).increment(1);
        outcome
    }

    /// Release `conn`'s identifier and mark it gone. Safe to call repeatedly.
    pub fn disconnect(&self, conn: &Connection) -> Option<Identifier> {
        let id = conn.mark_gone()?;
        if self.registry.release_owned(id.as_str(), conn) {
            info!(conn_id = %conn.id, %id, "identifier released");
        }
        Some(id)
    }

    async fn init(&self, conn: &Arc<Connection>) -> RouteOutcome {
        // A second init keeps the existing identifier.
        if let Some(id) = conn.identifier() {
            debug!(%id, "already identified, repeating identifier");
            return reply(conn, ServerEvent::Init { id });
        }

        let id = match self.registry.claim(conn.clone()).await {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "could not allocate identifier");
                return reply_failed(conn);
            }
        };

        if !conn.assign(id.clone()) {
            // Disconnected while allocating.
            let _ = self.registry.release_owned(id.as_str(), conn);
            return RouteOutcome::Ignored;
        }
        info!(%id, "client identified");
        reply(conn, ServerEvent::Init { id })
    }

    fn request(&self, conn: &Connection, to: Option<&str>) -> RouteOutcome {
        let Some((from, target)) = self.resolve(conn, to) else {
            return RouteOutcome::Dropped;
        };
        forward(&target, ServerEvent::Request { from })
    }

    fn call(&self, conn: &Connection, to: Option<&str>, fields: Fields) -> RouteOutcome {
        let Some((from, target)) = self.resolve(conn, to) else {
            return reply_failed(conn);
        };
        match forward(&target, ServerEvent::Call { from, fields }) {
            RouteOutcome::Forwarded => RouteOutcome::Forwarded,
            _ => reply_failed(conn),
        }
    }

    fn end(&self, conn: &Connection, to: Option<&str>) -> RouteOutcome {
        let Some((_, target)) = self.resolve(conn, to) else {
            return RouteOutcome::Dropped;
        };
        forward(&target, ServerEvent::End)
    }

    /// Sender identity and destination connection, or `None` when either is
    /// missing.
    fn resolve(&self, conn: &Connection, to: Option<&str>) -> Option<(Identifier, Arc<Connection>)> {
        let Some(from) = conn.identifier() else {
            debug!("sender has no identifier yet");
            return None;
        };
        let Some(to) = to else {
            debug!("payload has no destination");
            return None;
        };
        let target = self.registry.lookup(to);
        if target.is_none() {
            debug!(to, "unknown destination");
        }
        target.map(|target| (from, target))
    }
}

fn reply(conn: &Connection, event: ServerEvent) -> RouteOutcome {
    if conn.emit(event) {
        RouteOutcome::Replied
    } else {
        outbound_dropped(conn);
        RouteOutcome::Dropped
    }
}

fn reply_failed(conn: &Connection) -> RouteOutcome {
    if conn.emit(ServerEvent::Failed) {
        RouteOutcome::Failed
    } else {
        outbound_dropped(conn);
        RouteOutcome::Dropped
    }
}

fn forward(target: &Connection, event: ServerEvent) -> RouteOutcome {
    if target.emit(event) {
        RouteOutcome::Forwarded
    } else {
        outbound_dropped(target);
        RouteOutcome::Dropped
    }
}

fn outbound_dropped(conn: &Connection) {
    warn!(conn_id = %conn.id, dropped = conn.drop_count(), "outbound queue full or closed, event dropped");
    counter!(WS_OUTBOUND_DROPS_TOTAL).increment(1);
}
