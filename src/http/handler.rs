//! Handler registration and URI resolution.
//!
//! # Responsibilities
//! - Define the interface external request handlers implement
//! - Resolve a request path to a handler via exact, then longest-prefix
//!   matching
//!
//! # Design Decisions
//! - Exact matches always beat prefix matches; among prefixes the longest
//!   one wins
//! - Each listener gets its own [`HandlerMap`], so a plaintext listener can
//!   be restricted to a public subset of handlers

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;

use crate::session::Session;

/// Request passed to handlers: the head plus the fully buffered body.
///
/// The bound session travels as a separate argument; a request-scoped
/// [`crate::auth::Principal`] rides in the request extensions when basic
/// authentication resolved one.
pub type HandlerRequest = Request<Bytes>;

/// Response produced by handlers.
pub type HandlerResponse = Response<Full<Bytes>>;

/// Error a handler may fail with; the binding service turns it into a 500.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A registered request handler.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle one request against the session bound to it.
    async fn handle(
        &self,
        request: HandlerRequest,
        session: Arc<Session>,
    ) -> Result<HandlerResponse, HandlerError>;
}

/// Maps request paths to handlers.
#[derive(Default)]
pub struct HandlerMap {
    exact: HashMap<String, Arc<dyn Handler>>,
    prefix: Vec<(String, Arc<dyn Handler>)>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an exact path.
    pub fn register(&mut self, path: impl Into<String>, handler: Arc<dyn Handler>) -> &mut Self {
        self.exact.insert(path.into(), handler);
        self
    }

    /// Register a handler for a path prefix.
    pub fn register_prefix(
        &mut self,
        prefix: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        let prefix = prefix.into();
        self.prefix.push((prefix, handler));
        // Longest prefix first, so resolution is a linear scan to the
        // first hit.
        self.prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    /// Resolve a path to its handler, if any is registered.
    pub fn resolve(&self, path: &str) -> Option<Arc<dyn Handler>> {
        if let Some(handler) = self.exact.get(path) {
            return Some(Arc::clone(handler));
        }
        self.prefix
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, handler)| Arc::clone(handler))
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefix.is_empty()
    }
}

/// Build a minimal response with the given status and body.
pub fn plain_response(status: StatusCode, body: &'static str) -> HandlerResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
