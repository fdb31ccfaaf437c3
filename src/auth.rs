//! Client authentication modes and Basic-credential extraction.
//!
//! # Responsibilities
//! - Define the three authentication modes (none, basic, certificate)
//! - Decode `Authorization: Basic` headers into a [`Principal`]
//!
//! # Design Decisions
//! - Credential *extraction* lives here; enforcement is left to handlers
//!   (basic mode) or to the TLS handshake (certificate mode)
//! - A missing or undecodable header is never an error at this layer; it
//!   simply yields no principal

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use http::header::AUTHORIZATION;
use http::HeaderMap;

/// How clients authenticate to the server, chosen once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No enforcement; every handler runs regardless of credentials.
    None,
    /// Basic credentials are surfaced as a [`Principal`]; handlers decide.
    Basic,
    /// The TLS handshake demands a client certificate; unauthenticated
    /// clients never reach a handler.
    Certificate,
}

impl AuthMode {
    /// Parse a configured mode string.
    ///
    /// Unrecognized or blank values fall back to `Basic`, the safe default.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => AuthMode::None,
            "cert" | "certificate" => AuthMode::Certificate,
            _ => AuthMode::Basic,
        }
    }
}

/// Resolved client identity for one request under basic authentication.
///
/// Never persisted; re-derived from the `Authorization` header per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
    secret: String,
}

impl Principal {
    /// The client's user name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared secret presented alongside the name.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

/// Extract a [`Principal`] from an `Authorization: Basic <base64>` header.
///
/// Returns `None` when the header is absent, is not the Basic scheme, or
/// does not decode to `name:secret`.
pub fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ").or_else(|| value.strip_prefix("basic "))?;
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, secret) = decoded.split_once(':')?;
    Some(Principal {
        name: name.to_string(),
        secret: secret.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_mode_strings() {
        assert_eq!(AuthMode::parse("none"), AuthMode::None);
        assert_eq!(AuthMode::parse("basic"), AuthMode::Basic);
        assert_eq!(AuthMode::parse("cert"), AuthMode::Certificate);
        assert_eq!(AuthMode::parse("Certificate"), AuthMode::Certificate);
    }

    #[test]
    fn unknown_mode_defaults_to_basic() {
        assert_eq!(AuthMode::parse(""), AuthMode::Basic);
        assert_eq!(AuthMode::parse("  "), AuthMode::Basic);
        assert_eq!(AuthMode::parse("kerberos"), AuthMode::Basic);
    }

    #[test]
    fn decodes_basic_credentials() {
        // "alice:secret"
        let headers = headers_with_auth("Basic YWxpY2U6c2VjcmV0");
        let principal = principal_from_headers(&headers).unwrap();
        assert_eq!(principal.name(), "alice");
        assert_eq!(principal.secret(), "secret");
    }

    #[test]
    fn secret_may_contain_colons() {
        // "alice:se:cr:et" — only the first colon separates name and secret
        let headers = headers_with_auth("Basic YWxpY2U6c2U6Y3I6ZXQ=");
        let principal = principal_from_headers(&headers).unwrap();
        assert_eq!(principal.name(), "alice");
        assert_eq!(principal.secret(), "se:cr:et");
    }

    #[test]
    fn absent_or_malformed_header_yields_no_principal() {
        assert!(principal_from_headers(&HeaderMap::new()).is_none());
        assert!(principal_from_headers(&headers_with_auth("Bearer token")).is_none());
        assert!(principal_from_headers(&headers_with_auth("Basic not-base64!!")).is_none());
        // decodes but has no colon
        assert!(principal_from_headers(&headers_with_auth("Basic YWxpY2U=")).is_none());
    }
}
