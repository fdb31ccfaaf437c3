//! Configuration schema definitions.
//!
//! The validated, strongly-typed settings the rest of the server consumes.
//! Raw string-keyed values are turned into this struct by
//! [`crate::config::validation`]; once built it is immutable for the life
//! of the server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::AuthMode;

/// Default session cookie name, used when none is configured.
pub const DEFAULT_SESSION_COOKIE: &str = "ANTEROOMSESSIONID";

/// Default idle lifetime for sessions: 30 minutes.
pub const DEFAULT_SESSION_LIFETIME_MS: u64 = 1_800_000;

/// Default minimum interval between cache purge sweeps.
pub const DEFAULT_PURGE_INTERVAL_MS: u64 = 30_000;

/// Default cap on concurrent connections per listener.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

/// Default timeout for reading a request head.
pub const DEFAULT_HEADER_READ_TIMEOUT_MS: u64 = 30_000;

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server home directory. Must exist; the keystore lives under it.
    pub home: PathBuf,

    /// Static content root, consumed by external file handlers.
    pub web_root: PathBuf,

    /// TLS listener port. `None` means the TLS listener is disabled.
    pub tls_port: Option<u16>,

    /// Plaintext listener port. `None` means that listener is disabled.
    pub plain_port: Option<u16>,

    /// Client authentication mode.
    pub auth_mode: AuthMode,

    /// Idle lifetime after which a session expires. Zero = never expires.
    pub session_lifetime: Duration,

    /// Name of the cookie carrying the session id.
    pub session_cookie_name: String,

    /// Minimum interval between full cache purge sweeps.
    pub purge_interval: Duration,

    /// Maximum concurrent connections per listener.
    pub max_connections: usize,

    /// Timeout for reading a request head off the socket.
    pub header_read_timeout: Duration,
}

impl ServerConfig {
    /// Path of the keystore file holding the server's TLS identity.
    pub fn keystore_path(&self) -> PathBuf {
        self.home.join("etc").join("keystore")
    }

    /// Path of the PEM bundle of CA roots trusted for client certificates.
    pub fn truststore_path(&self) -> PathBuf {
        self.home.join("etc").join("truststore")
    }

    /// Convenience constructor for embedding and tests: both listeners
    /// disabled, defaults everywhere else.
    pub fn for_home(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref().to_path_buf();
        Self {
            web_root: home.join("web"),
            home,
            tls_port: None,
            plain_port: None,
            auth_mode: AuthMode::Basic,
            session_lifetime: Duration::from_millis(DEFAULT_SESSION_LIFETIME_MS),
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            purge_interval: Duration::from_millis(DEFAULT_PURGE_INTERVAL_MS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            header_read_timeout: Duration::from_millis(DEFAULT_HEADER_READ_TIMEOUT_MS),
        }
    }
}
