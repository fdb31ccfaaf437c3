//! Configuration validation.
//!
//! # Responsibilities
//! - Turn a generic string-keyed settings source into a validated
//!   [`ServerConfig`]
//! - Fail fast with diagnostics that name the offending key
//!
//! # Design Decisions
//! - Validation happens once, at construction time, never at request time
//! - Ports must be present; a value ≤ 0 disables that listener
//! - Bad session-lifetime input clamps to 0 ("never expires" is the safe
//!   default), unlike ports, which reject non-numeric input outright

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::AuthMode;
use crate::config::schema::{
    ServerConfig, DEFAULT_HEADER_READ_TIMEOUT_MS, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_PURGE_INTERVAL_MS, DEFAULT_SESSION_COOKIE, DEFAULT_SESSION_LIFETIME_MS,
};
use crate::tls::keystore::KeystoreError;

/// Environment variable carrying the keystore password.
///
/// The password is deliberately never part of the settings source.
pub const PASSWORD_ENV: &str = "ANTEROOM_KEYSTORE_PASSWORD";

/// Setting keys consumed by the validator.
pub mod keys {
    /// Server home directory; must exist.
    pub const HOME: &str = "server.home";
    /// Static content root.
    pub const WEB_ROOT: &str = "server.web_root";
    /// TLS listener port; ≤ 0 disables the TLS listener.
    pub const TLS_PORT: &str = "server.tls_port";
    /// Plaintext listener port; ≤ 0 disables the plaintext listener.
    pub const PLAIN_PORT: &str = "server.plain_port";
    /// Authentication mode: none, basic, or cert(ificate).
    pub const AUTH_MODE: &str = "server.auth_mode";
    /// Session idle lifetime in milliseconds; 0 = never expires.
    pub const SESSION_LIFETIME_MS: &str = "server.session_lifetime_ms";
    /// Session cookie name; identifier grammar.
    pub const SESSION_COOKIE_NAME: &str = "server.session_cookie_name";
    /// Minimum interval between cache purge sweeps, in milliseconds.
    pub const PURGE_INTERVAL_MS: &str = "server.purge_interval_ms";
    /// Maximum concurrent connections per listener.
    pub const MAX_CONNECTIONS: &str = "server.max_connections";
    /// Timeout for reading a request head, in milliseconds.
    pub const HEADER_READ_TIMEOUT_MS: &str = "server.header_read_timeout_ms";
}

/// Generic string-keyed settings source.
pub type Settings = BTreeMap<String, String>;

/// Error raised when configuration or TLS identity construction fails.
///
/// These surface synchronously to whoever constructs the server; a server
/// with a configuration error never starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required setting `{0}` is not set")]
    Missing(&'static str),

    #[error("setting `{key}` has invalid value `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("home directory `{0}` does not exist or is not a directory")]
    HomeDirectory(PathBuf),

    #[error("session cookie name `{0}` does not match `^[A-Za-z_][A-Za-z0-9_]*$`")]
    CookieName(String),

    #[error("no keystore password available; set the `{0}` environment variable")]
    MissingPassword(&'static str),

    #[error(transparent)]
    Keystore(#[from] KeystoreError),

    #[error("client certificate mode requires a CA bundle at `{0}`")]
    MissingTruststore(PathBuf),

    #[error("TLS context construction failed: {0}")]
    Tls(String),
}

/// Read the keystore password from the environment.
///
/// A blank value is treated the same as an unset one.
pub fn password_from_env() -> Result<String, ConfigError> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .ok_or(ConfigError::MissingPassword(PASSWORD_ENV))
}

/// Validate a settings source into a [`ServerConfig`].
pub fn validate(settings: &Settings) -> Result<ServerConfig, ConfigError> {
    let home = PathBuf::from(
        settings
            .get(keys::HOME)
            .ok_or(ConfigError::Missing(keys::HOME))?,
    );
    if !home.is_dir() {
        return Err(ConfigError::HomeDirectory(home));
    }

    let web_root = settings
        .get(keys::WEB_ROOT)
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join("web"));

    let tls_port = parse_port(settings, keys::TLS_PORT)?;
    let plain_port = parse_port(settings, keys::PLAIN_PORT)?;

    let auth_mode = settings
        .get(keys::AUTH_MODE)
        .map(|v| AuthMode::parse(v))
        .unwrap_or(AuthMode::Basic);

    let session_lifetime = match settings.get(keys::SESSION_LIFETIME_MS) {
        // Negative or unparsable input clamps to 0, never expiring.
        Some(v) => Duration::from_millis(v.trim().parse::<i64>().unwrap_or(0).max(0) as u64),
        None => Duration::from_millis(DEFAULT_SESSION_LIFETIME_MS),
    };

    let session_cookie_name = match settings.get(keys::SESSION_COOKIE_NAME) {
        Some(name) => {
            if !is_identifier(name) {
                return Err(ConfigError::CookieName(name.clone()));
            }
            name.clone()
        }
        None => DEFAULT_SESSION_COOKIE.to_string(),
    };

    let purge_interval = Duration::from_millis(parse_u64_or(
        settings,
        keys::PURGE_INTERVAL_MS,
        DEFAULT_PURGE_INTERVAL_MS,
    )?);

    let max_connections = parse_u64_or(
        settings,
        keys::MAX_CONNECTIONS,
        DEFAULT_MAX_CONNECTIONS as u64,
    )? as usize;
    if max_connections == 0 {
        return Err(ConfigError::Invalid {
            key: keys::MAX_CONNECTIONS,
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let header_read_timeout = Duration::from_millis(parse_u64_or(
        settings,
        keys::HEADER_READ_TIMEOUT_MS,
        DEFAULT_HEADER_READ_TIMEOUT_MS,
    )?);

    Ok(ServerConfig {
        home,
        web_root,
        tls_port,
        plain_port,
        auth_mode,
        session_lifetime,
        session_cookie_name,
        purge_interval,
        max_connections,
        header_read_timeout,
    })
}

/// Parse a listener port. The key must be set; ≤ 0 disables the listener.
fn parse_port(settings: &Settings, key: &'static str) -> Result<Option<u16>, ConfigError> {
    let raw = settings.get(key).ok_or(ConfigError::Missing(key))?;
    let value: i64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: "not an integer".to_string(),
    })?;
    if value <= 0 {
        return Ok(None);
    }
    u16::try_from(value)
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: "out of port range".to_string(),
        })
}

fn parse_u64_or(settings: &Settings, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match settings.get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: "not a non-negative integer".to_string(),
        }),
        None => Ok(default),
    }
}

/// Identifier grammar for cookie names: `^[A-Za-z_][A-Za-z0-9_]*$`.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
