//! Settings types with compiled defaults.
//!
//! Field names serialize as camelCase so the JSON settings file reads
//! naturally (`"staticDir"`, `"maxAttempts"`). Every struct carries
//! `#[serde(default)]`, so a partial file only overrides what it names.

use parley_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleySettings {
    /// Listener, transport and static asset settings.
    pub server: ServerSettings,
    /// Identifier allocation.
    pub identifiers: IdentifierSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl ParleySettings {
    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SettingsError::InvalidValue(msg.to_owned()));

        if self.identifiers.max_attempts == 0 {
            return invalid("identifiers.maxAttempts must be at least 1");
        }
        if self.server.max_connections == 0 {
            return invalid("server.maxConnections must be at least 1");
        }
        if self.server.send_queue_capacity == 0 {
            return invalid("server.sendQueueCapacity must be at least 1");
        }
        if self.server.heartbeat_interval_ms == 0 {
            return invalid("server.heartbeatIntervalMs must be at least 1");
        }
        if self.server.heartbeat_timeout_ms < self.server.heartbeat_interval_ms {
            return invalid("server.heartbeatTimeoutMs must not be shorter than heartbeatIntervalMs");
        }
        Ok(())
    }
}

/// Listener and transport settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (0 for auto-assign).
    pub port: u16,
    /// Directory served as static assets, relative to the working directory.
    pub static_dir: String,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Maximum inbound frame size in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per connection.
    pub send_queue_capacity: usize,
    /// Interval between server pings.
    pub heartbeat_interval_ms: u64,
    /// Silence after which a client is disconnected.
    pub heartbeat_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            static_dir: "../client".into(),
            max_connections: 1024,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            heartbeat_interval_ms: 25_000,
            heartbeat_timeout_ms: 60_000,
        }
    }
}

/// Identifier allocation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentifierSettings {
    /// Candidates tried before `init` fails.
    pub max_attempts: u32,
    /// Pause between colliding candidates.
    pub retry_delay_ms: u64,
    /// Exclusive bound of the numeric token (0 drops the token).
    pub token_range: u32,
}

impl Default for IdentifierSettings {
    fn default() -> Self {
        Self {
            max_attempts: 64,
            retry_delay_ms: 5,
            token_range: 10_000,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = ParleySettings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.static_dir, "../client");
        assert_eq!(settings.identifiers.max_attempts, 64);
        assert_eq!(settings.identifiers.retry_delay_ms, 5);
        assert_eq!(settings.identifiers.token_range, 10_000);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn defaults_validate() {
        assert!(ParleySettings::default().validate().is_ok());
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(ParleySettings::default()).unwrap();
        assert_eq!(value["server"]["staticDir"], "../client");
        assert_eq!(value["server"]["heartbeatIntervalMs"], 25_000);
        assert_eq!(value["identifiers"]["maxAttempts"], 64);
        assert_eq!(value["logging"]["format"], "compact");
    }

    #[test]
    fn partial_struct_fills_defaults() {
        let settings: ParleySettings =
            serde_json::from_str(r#"{"server":{"port":9000}}"#).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.max_connections, 1024);
        assert_eq!(settings.identifiers, IdentifierSettings::default());
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut settings = ParleySettings::default();
        settings.identifiers.max_attempts = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("maxAttempts"));
    }

    #[test]
    fn zero_queue_rejected() {
        let mut settings = ParleySettings::default();
        settings.server.send_queue_capacity = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn timeout_shorter_than_interval_rejected() {
        let mut settings = ParleySettings::default();
        settings.server.heartbeat_interval_ms = 10_000;
        settings.server.heartbeat_timeout_ms = 5_000;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("heartbeatTimeoutMs"));
    }
}
