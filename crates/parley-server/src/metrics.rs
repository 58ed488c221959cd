//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder.
///
/// Returns the handle that renders `/metrics`. Call once at startup before
/// anything is recorded; a second install fails.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// WebSocket connections opened (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Upgrades refused at the connection limit (counter).
pub const WS_CONNECTIONS_REJECTED_TOTAL: &str = "ws_connections_rejected_total";
/// Connection lifetime (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Frames that failed to parse (counter).
pub const WS_INVALID_FRAMES_TOTAL: &str = "ws_invalid_frames_total";
/// Outbound events dropped on a full or closed queue (counter).
pub const WS_OUTBOUND_DROPS_TOTAL: &str = "ws_outbound_drops_total";
/// Client events routed (counter, labels: event, outcome).
pub const SIGNAL_EVENTS_TOTAL: &str = "signal_events_total";
/// Registered identifiers (gauge).
pub const IDENTIFIERS_ACTIVE: &str = "identifiers_active";
/// Candidate identifiers that were already taken (counter).
pub const ID_COLLISIONS_TOTAL: &str = "id_collisions_total";
/// `init`s that ran out of allocation attempts (counter).
pub const ID_EXHAUSTED_TOTAL: &str = "id_exhausted_total";
