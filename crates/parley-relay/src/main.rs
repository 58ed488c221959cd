//! # parley
//!
//! Signaling relay binary: loads settings, starts the HTTP/WebSocket server
//! and runs until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use parley_core::logging::{LogFormat, init_subscriber};
use parley_server::config::ServerConfig;
use parley_server::metrics::install_recorder;
use parley_server::server::RelayServer;
use parley_server::shutdown::DEFAULT_DRAIN_TIMEOUT;
use parley_settings::{ParleySettings, load_settings_from_path, settings_path};

/// Rendezvous relay for peer-to-peer call signaling.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Rendezvous relay for peer-to-peer call signaling")]
struct Cli {
    /// Settings file (defaults to `~/.parley/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long, short)]
    port: Option<u16>,

    /// Directory of static client assets.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Log level or `EnvFilter` directive (overridden by `RUST_LOG`).
    #[arg(long)]
    log_level: Option<String>,

    /// Log line format: `compact` or `json`.
    #[arg(long, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Command-line flags win over file and environment.
    fn apply(&self, settings: &mut ParleySettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.static_dir {
            settings.server.static_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
    }
}

fn parse_log_format(val: &str) -> Result<LogFormat, String> {
    LogFormat::parse(val).ok_or_else(|| format!("unknown log format `{val}` (expected compact or json)"))
}

fn load(cli: &Cli) -> Result<ParleySettings> {
    let path = cli.config.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;

    init_subscriber(&settings.logging.level, settings.logging.format);

    let metrics = install_recorder().context("Failed to install metrics recorder")?;
    let server = RelayServer::new(ServerConfig::from_settings(&settings), Some(metrics));

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("parley listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    let _ = server.shutdown().drain(vec![handle], DEFAULT_DRAIN_TIMEOUT).await;
    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_leave_settings_untouched() {
        let cli = Cli::parse_from(["parley"]);
        let mut settings = ParleySettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, ParleySettings::default());
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "parley",
            "--host",
            "127.0.0.1",
            "-p",
            "9000",
            "--static-dir",
            "public",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ]);
        let mut settings = ParleySettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.static_dir, "public");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn bad_log_format_rejected() {
        let result = Cli::try_parse_from(["parley", "--log-format", "yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 7000, "staticDir": "www"}}"#).unwrap();

        let cli = Cli::parse_from([
            "parley",
            "--config",
            path.to_str().unwrap(),
            "--static-dir",
            "site",
        ]);
        let settings = load(&cli).unwrap();
        assert_eq!(settings.server.static_dir, "site");
        // Port from the file unless PORT/PARLEY_PORT is set in the test environment.
        if std::env::var_os("PORT").is_none() && std::env::var_os("PARLEY_PORT").is_none() {
            assert_eq!(settings.server.port, 7000);
        }
    }

    #[test]
    fn load_rejects_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"identifiers": {"maxAttempts": 0}}"#).unwrap();

        let cli = Cli::parse_from(["parley", "--config", path.to_str().unwrap()]);
        let err = load(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("maxAttempts"));
    }
}
