//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use parley_settings::ParleySettings;
use serde::{Deserialize, Serialize};

use crate::signal::registry::AllocationPolicy;
use crate::websocket::session::SessionSettings;

/// Runtime configuration for [`RelayServer`](crate::server::RelayServer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to (0 for auto-assign).
    pub port: u16,
    /// Directory served for every path that is not a relay endpoint.
    pub static_dir: PathBuf,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Maximum inbound frame size in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per connection.
    pub send_queue_capacity: usize,
    /// Ping interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Silence in milliseconds before a client is dropped.
    pub heartbeat_timeout_ms: u64,
    /// Candidates tried per `init` before giving up.
    pub id_max_attempts: u32,
    /// Pause between colliding candidates in milliseconds.
    pub id_retry_delay_ms: u64,
    /// Exclusive bound of the identifier's numeric token.
    pub id_token_range: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            static_dir: PathBuf::from("../client"),
            max_connections: 1024,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            heartbeat_interval_ms: 25_000,
            heartbeat_timeout_ms: 60_000,
            id_max_attempts: 64,
            id_retry_delay_ms: 5,
            id_token_range: parley_core::ids::DEFAULT_TOKEN_RANGE,
        }
    }
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &ParleySettings) -> Self {
        let server = &settings.server;
        let ids = &settings.identifiers;
        Self {
            host: server.host.clone(),
            port: server.port,
            static_dir: PathBuf::from(&server.static_dir),
            max_connections: server.max_connections,
            max_message_size: server.max_message_size,
            send_queue_capacity: server.send_queue_capacity,
            heartbeat_interval_ms: server.heartbeat_interval_ms,
            heartbeat_timeout_ms: server.heartbeat_timeout_ms,
            id_max_attempts: ids.max_attempts,
            id_retry_delay_ms: ids.retry_delay_ms,
            id_token_range: ids.token_range,
        }
    }

    /// Retry policy for identifier allocation.
    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            max_attempts: self.id_max_attempts,
            retry_delay: Duration::from_millis(self.id_retry_delay_ms),
        }
    }

    /// Per-connection transport settings.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            send_queue_capacity: self.send_queue_capacity.max(1),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms.max(1)),
            heartbeat_timeout: Duration::from_millis(self.heartbeat_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_loopback_ephemeral() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 0);
    }

    #[test]
    fn from_settings_copies_every_field() {
        let mut settings = ParleySettings::default();
        settings.server.port = 4242;
        settings.server.static_dir = "public".into();
        settings.identifiers.max_attempts = 8;
        settings.identifiers.retry_delay_ms = 0;
        settings.identifiers.token_range = 100;

        let config = ServerConfig::from_settings(&settings);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 4242);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.id_max_attempts, 8);
        assert_eq!(config.id_retry_delay_ms, 0);
        assert_eq!(config.id_token_range, 100);
        assert_eq!(config.heartbeat_timeout_ms, 60_000);
    }

    #[test]
    fn allocation_policy_converts_delay() {
        let config = ServerConfig {
            id_max_attempts: 3,
            id_retry_delay_ms: 250,
            ..ServerConfig::default()
        };
        let policy = config.allocation_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn session_settings_never_zero_capacity() {
        let config = ServerConfig {
            send_queue_capacity: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.session_settings().send_queue_capacity, 1);
    }

    #[test]
    fn serde_roundtrip() {
        let config = ServerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
