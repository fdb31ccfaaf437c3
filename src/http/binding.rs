//! Per-request session binding, credential extraction, and access logging.
//!
//! # Responsibilities
//! - Resolve the session named by the request's cookie, creating one on
//!   demand through the cache
//! - Emit a `Set-Cookie` only when the client's presented id was not
//!   accepted unchanged
//! - Surface Basic credentials as a [`Principal`] request extension
//! - Emit exactly one access-log line per request
//!
//! # Design Decisions
//! - Sits between the connection dispatcher and the handler map; handlers
//!   never see cookie or credential plumbing
//! - Session resolution never fails: an invalid or expired id simply means
//!   a fresh session
//! - The access-log format is a compatibility contract; see
//!   [`crate::observability::logging::ACCESS_LOG_TARGET`]

use std::net::SocketAddr;
use std::sync::Arc;

use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Request, StatusCode};
use http_body_util::BodyExt;

use crate::auth::{principal_from_headers, AuthMode};
use crate::http::handler::{plain_response, HandlerMap, HandlerResponse};
use crate::observability::logging::ACCESS_LOG_TARGET;
use crate::session::{Session, SessionCache};

/// Per-listener request entry point.
///
/// One instance per listener; all instances share the server's cache.
pub struct SessionBinding {
    cache: Arc<SessionCache>,
    handlers: Arc<HandlerMap>,
    auth_mode: AuthMode,
    cookie_name: String,
}

impl SessionBinding {
    pub fn new(
        cache: Arc<SessionCache>,
        handlers: Arc<HandlerMap>,
        auth_mode: AuthMode,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            handlers,
            auth_mode,
            cookie_name: cookie_name.into(),
        }
    }

    /// Run one request through session binding, the handler map, and access
    /// logging. Never fails; faults become error responses.
    pub async fn dispatch<B>(&self, remote: SocketAddr, request: Request<B>) -> HandlerResponse
    where
        B: hyper::body::Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let presented = session_id_from_headers(request.headers(), &self.cookie_name);
        let session = self.cache.get(presented.as_deref());

        // The cache hands back a different id exactly when the presented id
        // was absent, unknown, or expired.
        let emit_cookie = presented.as_deref() != Some(session.id());

        let method = request.method().clone();
        let uri = request.uri().clone();
        let version = request.version();

        let mut response = self.run_handler(request, Arc::clone(&session)).await;

        if emit_cookie {
            let cookie = format!(
                "{}={}; Path=/; Secure; HttpOnly",
                self.cookie_name,
                session.id()
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }

        tracing::info!(
            target: ACCESS_LOG_TARGET,
            "{} - {} \"{} {} {:?}\" {}",
            remote.ip(),
            session.id(),
            method,
            uri,
            version,
            response.status().as_u16(),
        );

        response
    }

    async fn run_handler<B>(&self, request: Request<B>, session: Arc<Session>) -> HandlerResponse
    where
        B: hyper::body::Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let (mut parts, body) = request.into_parts();

        if self.auth_mode == AuthMode::Basic {
            if let Some(principal) = principal_from_headers(&parts.headers) {
                parts.extensions.insert(principal);
            }
        }

        let handler = match self.handlers.resolve(parts.uri.path()) {
            Some(handler) => handler,
            None => return plain_response(StatusCode::NOT_FOUND, "Not Found"),
        };

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read request body");
                return plain_response(StatusCode::BAD_REQUEST, "Bad Request");
            }
        };

        match handler.handle(Request::from_parts(parts, body), session).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "handler failed");
                plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

/// Scan all `Cookie` headers for the configured session cookie.
///
/// A blank value counts as absent; a single pair of surrounding double
/// quotes is stripped. The first match wins.
pub(crate) fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else { continue };
        for pair in header.split(';') {
            let Some((name, value)) = pair.split_once('=') else { continue };
            if name.trim() != cookie_name {
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            return Some(value.to_string());
        }
    }
    None
}
