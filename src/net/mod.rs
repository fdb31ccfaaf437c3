//! Socket handling: listener lifecycle and connection dispatch.

pub mod connection;
pub mod listener;

pub use connection::ConnectionId;
pub use listener::{ListenerBindings, Server};
