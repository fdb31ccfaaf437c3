//! Sessions and the time-based session cache.

pub mod cache;
pub mod store;

pub use cache::{CacheConfig, SessionCache};
pub use store::Session;
