//! Request-side services: handler registration and session binding.

pub mod binding;
pub mod handler;

pub use binding::SessionBinding;
pub use handler::{Handler, HandlerError, HandlerMap, HandlerRequest, HandlerResponse};
