//! WebSocket session lifecycle for one client, from upgrade to disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use parley_core::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, instrument, warn};

use super::slots::SlotGuard;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL, WS_INVALID_FRAMES_TOTAL,
};
use crate::signal::{Connection, SignalRouter};

/// How long the writer gets to flush and send a close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Per-connection transport settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Outbound queue depth.
    pub send_queue_capacity: usize,
    /// Interval between server Ping frames.
    pub heartbeat_interval: Duration,
    /// Silence after which the client is dropped.
    pub heartbeat_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            send_queue_capacity: 256,
            heartbeat_interval: Duration::from_secs(25),
            heartbeat_timeout: Duration::from_secs(60),
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Wraps the socket's write half in a [`Connection`] backed by a bounded queue
/// 2. Parses inbound text (or UTF-8 binary) frames and routes them in order
/// 3. Sends periodic Ping frames and drops clients silent past the timeout
/// 4. Releases the client's identifier on disconnect or server shutdown
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    conn_id: String,
    router: Arc<SignalRouter>,
    settings: SessionSettings,
    shutdown: CancellationToken,
    _slot: SlotGuard,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<ServerEvent>(settings.send_queue_capacity);
    let conn = Arc::new(Connection::new(conn_id, send_tx));
    let session = shutdown.child_token();

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let outbound_conn = conn.clone();
    let outbound_session = session.clone();
    let mut outbound = tokio::spawn(
        async move {
            let mut ping_interval = tokio::time::interval(settings.heartbeat_interval);
            // Skip the immediate first tick
            let _ = ping_interval.tick().await;

            loop {
                tokio::select! {
                    () = outbound_session.cancelled() => break,
                    event = send_rx.recv() => {
                        let Some(event) = event else { break };
                        if ws_tx.send(Message::Text(event.to_json().into())).await.is_err() {
                            break;
                        }
                    }
                    _ = ping_interval.tick() => {
                        if !outbound_conn.check_alive()
                            && outbound_conn.last_pong_elapsed() > settings.heartbeat_timeout
                        {
                            warn!(timeout = ?settings.heartbeat_timeout, "client unresponsive, disconnecting");
                            break;
                        }
                        if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                }
            }

            let _ = ws_tx.close().await;
            // Wake the reader if the writer stopped first.
            outbound_session.cancel();
        }
        .in_current_span(),
    );

    loop {
        let frame = tokio::select! {
            () = session.cancelled() => break,
            frame = ws_rx.next() => frame,
        };
        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(err)) => {
                debug!(error = %err, "websocket read failed");
                break;
            }
            None => break,
        };

        conn.mark_alive();
        match msg {
            Message::Text(text) => handle_frame(&router, &conn, text.as_str()).await,
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => handle_frame(&router, &conn, text).await,
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    counter!(WS_INVALID_FRAMES_TOTAL).increment(1);
                }
            },
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    let released = router.disconnect(&conn);
    session.cancel();
    if tokio::time::timeout(CLOSE_GRACE, &mut outbound).await.is_err() {
        outbound.abort();
    }

    info!(
        identifier = released.as_ref().map_or("-", |id| id.as_str()),
        dropped = conn.drop_count(),
        "client disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(conn.age().as_secs_f64());
}

/// Parse one frame and hand it to the router. Malformed frames are dropped.
async fn handle_frame(router: &SignalRouter, conn: &Arc<Connection>, text: &str) {
    match ClientEvent::parse(text) {
        Ok(event) => {
            let _ = router.dispatch(conn, event).await;
        }
        Err(err) => {
            warn!(error = %err, "dropping malformed frame");
            counter!(WS_INVALID_FRAMES_TOTAL).increment(1);
        }
    }
}
