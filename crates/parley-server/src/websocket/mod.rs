//! WebSocket transport: one session task per connected client.

pub mod session;
pub mod slots;
