//! Anteroom: an embeddable HTTPS(+HTTP) application server.
//!
//! Layers cookie-based session affinity, pluggable client authentication,
//! and TLS identity management on top of raw socket handling, hosting small
//! request-handler sets behind a session- and auth-aware front door.
//!
//! # Architecture Overview
//!
//! ```text
//!   settings ──▶ config ──▶ tls (identity) ──▶ net (listeners)
//!                                                  │
//!                                          one task per connection
//!                                                  │
//!                                       http::binding (sessions, auth,
//!                                            access log)
//!                                                  │
//!                                       http::handler (registered
//!                                            handler map)
//!                                                  │
//!                                        session::cache (shared)
//! ```
//!
//! Two listeners at most: TLS and plaintext, each enabled by its configured
//! port and carrying its own handler set. Request handlers, file serving,
//! and directory plumbing live outside this crate; they plug in through
//! [`http::HandlerMap`].

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod session;
pub mod tls;

// Cross-cutting concerns
pub mod auth;
pub mod lifecycle;
pub mod observability;

pub use auth::{AuthMode, Principal};
pub use config::{ConfigError, ServerConfig};
pub use http::{Handler, HandlerMap, HandlerRequest, HandlerResponse};
pub use net::{ListenerBindings, Server};
pub use session::{Session, SessionCache};
