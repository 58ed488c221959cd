//! # parley-core
//!
//! Foundation types for the parley signaling relay.
//!
//! - [`ids`]: client identifiers and the haiku-style generator
//! - [`protocol`]: JSON envelopes exchanged with clients
//! - [`errors`]: protocol and registry error types
//! - [`logging`]: `tracing` subscriber bootstrap

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod protocol;

pub use errors::{ProtocolError, RegistryError};
pub use ids::{HaikuGenerator, IdGenerator, Identifier};
pub use protocol::{ClientEvent, ServerEvent};
