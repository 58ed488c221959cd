//! Identifier registry and event routing.
//!
//! Transport-independent: a [`Connection`](connection::Connection) is a
//! handle around an outbound queue, so the router can be driven directly in
//! tests without sockets.

pub mod connection;
pub mod registry;
pub mod router;

pub use connection::{Connection, ConnectionState};
pub use registry::{AllocationPolicy, Registry};
pub use router::{RouteOutcome, SignalRouter};
