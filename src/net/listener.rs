//! Listener lifecycle.
//!
//! # Responsibilities
//! - Manage up to two independent listeners: TLS and plaintext
//! - Bind each listener only when its configured port is enabled
//! - Treat a failed bind as non-fatal: log at INFO, leave that listener
//!   not running
//! - Report whether any configured listener has a live accept loop
//!
//! # Design Decisions
//! - Non-fatal bind failure is unusual but deliberate: a deployment with
//!   one port already taken still serves on the other
//! - Stop is signaled through a broadcast channel raced against accept,
//!   not by interrupting worker tasks

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::config::{password_from_env, ConfigError, ServerConfig};
use crate::http::{HandlerMap, SessionBinding};
use crate::lifecycle::Shutdown;
use crate::net::connection::{accept_loop, ListenerRuntime};
use crate::session::{CacheConfig, SessionCache};
use crate::tls::build_tls_context;

/// Handler sets for the two listeners.
///
/// Supplied by the embedding application; the plaintext listener is often
/// restricted to public or static content only.
#[derive(Clone)]
pub struct ListenerBindings {
    pub tls: Arc<HandlerMap>,
    pub plain: Arc<HandlerMap>,
}

impl ListenerBindings {
    /// Use the same handler set on both listeners.
    pub fn shared(handlers: Arc<HandlerMap>) -> Self {
        Self {
            tls: Arc::clone(&handlers),
            plain: handlers,
        }
    }
}

/// The embeddable application server.
///
/// Constructed from validated configuration; construction fails fast on any
/// configuration or TLS identity problem, while `start` only ever reports
/// per-listener bind trouble through the log.
pub struct Server {
    config: ServerConfig,
    tls_context: Option<Arc<rustls::ServerConfig>>,
    cache: Arc<SessionCache>,
    bindings: ListenerBindings,
    shutdown: Shutdown,
    tls_running: Arc<AtomicBool>,
    plain_running: Arc<AtomicBool>,
    loops: Vec<JoinHandle<()>>,
}

impl Server {
    /// Build a server, sourcing the keystore password from the environment
    /// when the TLS listener is enabled.
    pub fn new(config: ServerConfig, bindings: ListenerBindings) -> Result<Self, ConfigError> {
        let password = if config.tls_port.is_some() {
            Some(password_from_env()?)
        } else {
            None
        };
        Self::build(config, bindings, password.as_deref())
    }

    /// Build a server with an explicitly supplied keystore password.
    pub fn with_password(
        config: ServerConfig,
        bindings: ListenerBindings,
        password: &str,
    ) -> Result<Self, ConfigError> {
        Self::build(config, bindings, Some(password))
    }

    fn build(
        config: ServerConfig,
        bindings: ListenerBindings,
        password: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let tls_context = match (config.tls_port, password) {
            (Some(_), Some(password)) => Some(build_tls_context(&config, password)?),
            (Some(_), None) => return Err(ConfigError::MissingPassword(crate::config::PASSWORD_ENV)),
            (None, _) => None,
        };

        let cache = Arc::new(SessionCache::new(CacheConfig {
            lifetime: config.session_lifetime,
            purge_interval: config.purge_interval,
        }));

        Ok(Self {
            config,
            tls_context,
            cache,
            bindings,
            shutdown: Shutdown::new(),
            tls_running: Arc::new(AtomicBool::new(false)),
            plain_running: Arc::new(AtomicBool::new(false)),
            loops: Vec::new(),
        })
    }

    /// Bind every enabled listener and spawn its accept loop.
    ///
    /// A port already held by another process logs at INFO and leaves that
    /// listener not running; the server as a whole continues.
    pub async fn start(&mut self) {
        if let Some(port) = self.config.tls_port {
            let acceptor = self
                .tls_context
                .as_ref()
                .map(|context| TlsAcceptor::from(Arc::clone(context)));
            let handlers = Arc::clone(&self.bindings.tls);
            let running = Arc::clone(&self.tls_running);
            self.spawn_listener("tls", port, acceptor, handlers, running).await;
        }

        if let Some(port) = self.config.plain_port {
            let handlers = Arc::clone(&self.bindings.plain);
            let running = Arc::clone(&self.plain_running);
            self.spawn_listener("plain", port, None, handlers, running).await;
        }
    }

    async fn spawn_listener(
        &mut self,
        label: &'static str,
        port: u16,
        tls: Option<TlsAcceptor>,
        handlers: Arc<HandlerMap>,
        running: Arc<AtomicBool>,
    ) {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::info!(
                    listener = label,
                    port,
                    error = %e,
                    "listener port unavailable; continuing without this listener"
                );
                return;
            }
        };

        let binding = Arc::new(SessionBinding::new(
            Arc::clone(&self.cache),
            handlers,
            self.config.auth_mode,
            self.config.session_cookie_name.clone(),
        ));
        let runtime = ListenerRuntime {
            label,
            tls,
            binding,
            permits: Arc::new(Semaphore::new(self.config.max_connections)),
            header_read_timeout: self.config.header_read_timeout,
            running: Arc::clone(&running),
        };

        running.store(true, Ordering::SeqCst);
        self.loops
            .push(tokio::spawn(accept_loop(listener, runtime, self.shutdown.subscribe())));
        tracing::info!(listener = label, %addr, "listener started");
    }

    /// Signal every accept loop to stop and wait for them to exit.
    ///
    /// Connections already being served drain on their own.
    pub async fn stop(&mut self) {
        self.shutdown.trigger();
        for handle in self.loops.drain(..) {
            let _ = handle.await;
        }
    }

    /// True while at least one configured listener has a live accept loop.
    pub fn is_running(&self) -> bool {
        self.tls_running.load(Ordering::SeqCst) || self.plain_running.load(Ordering::SeqCst)
    }

    /// The server's shared session cache.
    pub fn session_cache(&self) -> Arc<SessionCache> {
        Arc::clone(&self.cache)
    }

    /// The validated configuration this server runs with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
