//! Request and event handlers.

pub mod chat;
pub mod connection;
pub mod rooms;
pub mod signaling;

pub use connection::*;
