//! `RelayServer`: Axum HTTP + WebSocket server on a single listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use parley_core::HaikuGenerator;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::metrics::WS_CONNECTIONS_REJECTED_TOTAL;
use crate::shutdown::ShutdownCoordinator;
use crate::signal::{Registry, SignalRouter};
use crate::websocket::session::{SessionSettings, run_ws_session};
use crate::websocket::slots::ConnectionSlots;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Event router (and, through it, the registry).
    pub router: Arc<SignalRouter>,
    /// Open connection accounting.
    pub slots: Arc<ConnectionSlots>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Per-connection transport settings.
    pub session: SessionSettings,
    /// Maximum inbound frame size.
    pub max_message_size: usize,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The relay server.
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<Registry>,
    router: Arc<SignalRouter>,
    slots: Arc<ConnectionSlots>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl RelayServer {
    /// Create a server with a fresh, empty registry.
    pub fn new(config: ServerConfig, metrics: Option<PrometheusHandle>) -> Self {
        let registry = Arc::new(Registry::new(
            HaikuGenerator::new(config.id_token_range),
            config.allocation_policy(),
        ));
        let router = Arc::new(SignalRouter::new(registry.clone()));
        let slots = Arc::new(ConnectionSlots::new(config.max_connections));
        Self {
            config,
            registry,
            router,
            slots,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics,
        }
    }

    /// Build the Axum router.
    ///
    /// `/ws`, `/health` and `/metrics` are relay endpoints; every other path
    /// is served from the static asset directory.
    pub fn router(&self) -> Router {
        let state = AppState {
            router: self.router.clone(),
            slots: self.slots.clone(),
            shutdown: self.shutdown.clone(),
            session: self.config.session_settings(),
            max_message_size: self.config.max_message_size,
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .fallback_service(ServeDir::new(&self.config.static_dir))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the listener and serve until shutdown.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(err) = served {
                error!(error = %err, "server stopped with error");
            }
        });

        info!(
            %addr,
            static_dir = %self.config.static_dir.display(),
            "relay listening"
        );
        Ok((addr, handle))
    }

    /// The identifier registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The event router.
    pub fn signal_router(&self) -> &Arc<SignalRouter> {
        &self.router
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open WebSocket connections.
    pub fn connection_count(&self) -> usize {
        self.slots.active()
    }
}

/// GET /ws
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }
    let Some(slot) = state.slots.try_acquire() else {
        warn!(max = state.slots.max(), "connection limit reached, refusing upgrade");
        counter!(WS_CONNECTIONS_REJECTED_TOTAL).increment(1);
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    };

    let conn_id = format!("conn_{}", Uuid::now_v7());
    let router = state.router.clone();
    let token = state.shutdown.token();
    let session = state.session;
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, conn_id, router, session, token, slot))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.slots.active(),
        state.router.registry().len(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn make_server(static_dir: &std::path::Path) -> RelayServer {
        let config = ServerConfig {
            static_dir: static_dir.to_path_buf(),
            ..ServerConfig::default()
        };
        RelayServer::new(config, None)
    }

    async fn get_path(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn health_endpoint_returns_counts() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path());
        let (status, body) = get_path(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["identified"], 0);
    }

    #[tokio::test]
    async fn metrics_absent_without_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path());
        let (status, _) = get_path(server.router(), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_rendered_with_handle() {
        let dir = tempfile::tempdir().unwrap();
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let config = ServerConfig {
            static_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let server = RelayServer::new(config, Some(handle));
        let (status, _) = get_path(server.router(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn serves_static_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>parley</h1>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let server = make_server(dir.path());

        let (status, body) = get_path(server.router(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<h1>parley</h1>");

        let (status, body) = get_path(server.router(), "/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"console.log(1)");
    }

    #[tokio::test]
    async fn missing_asset_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path());
        let (status, _) = get_path(server.router(), "/nope.css").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_without_upgrade_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path());
        let (status, _) = get_path(server.router(), "/ws").await;
        assert!(status.is_client_error(), "got {status}");
        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn registry_uses_configured_policy() {
        let config = ServerConfig {
            id_max_attempts: 7,
            ..ServerConfig::default()
        };
        let server = RelayServer::new(config, None);
        assert_eq!(server.registry().policy().max_attempts, 7);
        assert!(server.registry().is_empty());
        assert!(Arc::ptr_eq(server.signal_router().registry(), server.registry()));
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path());
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("shutdown timed out")
            .expect("join error");
    }
}
