//! Server lifecycle: shutdown signaling.

pub mod shutdown;

pub use shutdown::Shutdown;
