//! # parley-settings
//!
//! Layered configuration for the relay: compiled defaults, an optional JSON
//! settings file, then environment variable overrides.
//!
//! Settings are loaded once by the binary and passed down explicitly; there
//! is no process-wide settings singleton.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{IdentifierSettings, LoggingSettings, ParleySettings, ServerSettings};
