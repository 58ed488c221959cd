//! # parley-server
//!
//! The relay itself: identifier registry, event router and the WebSocket
//! transport, served on one listener next to the static client assets.
//!
//! - [`signal`]: registry and router, independent of the transport
//! - [`websocket`]: per-client session tasks, heartbeat, connection limit
//! - [`server`]: Axum routes (`/ws`, `/health`, `/metrics`, static fallback)
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod signal;
pub mod websocket;

pub use config::ServerConfig;
pub use server::RelayServer;
