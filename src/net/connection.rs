//! Connection dispatch.
//!
//! # Responsibilities
//! - Run one accept loop per enabled listener
//! - Spawn a dedicated worker per accepted connection
//! - Pump request/response cycles through hyper until the peer closes
//! - Release the connection permit and socket on every exit path
//!
//! # Design Decisions
//! - Shutdown is an explicit broadcast signal raced against accept, so the
//!   loop can tell "stop requested" from a real accept fault
//! - A clean peer-initiated close is normal termination, not an error;
//!   faults terminate only that connection's worker
//! - In-flight workers are never interrupted on shutdown; they drain

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore};
use tokio_rustls::TlsAcceptor;

use crate::http::SessionBinding;

/// Global atomic counter for connection ids; uniqueness is all we need.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection, used in trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Everything an accept loop needs, cloned out of the server at start.
pub(crate) struct ListenerRuntime {
    pub label: &'static str,
    pub tls: Option<TlsAcceptor>,
    pub binding: Arc<SessionBinding>,
    pub permits: Arc<Semaphore>,
    pub header_read_timeout: Duration,
    pub running: Arc<AtomicBool>,
}

/// Accept connections until shutdown, spawning one worker each.
pub(crate) async fn accept_loop(
    listener: TcpListener,
    runtime: ListenerRuntime,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        // Acquire a permit first so a full server applies backpressure at
        // the accept stage.
        let permit = tokio::select! {
            _ = shutdown.recv() => break,
            permit = Arc::clone(&runtime.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let (stream, peer) = tokio::select! {
            _ = shutdown.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(listener = runtime.label, error = %e, "accept failed");
                    continue;
                }
            },
        };

        let id = ConnectionId::new();
        tracing::debug!(
            connection_id = %id,
            listener = runtime.label,
            peer = %peer,
            available_permits = runtime.permits.available_permits(),
            "connection accepted"
        );

        let tls = runtime.tls.clone();
        let binding = Arc::clone(&runtime.binding);
        let timeout = runtime.header_read_timeout;
        tokio::spawn(serve_connection(stream, peer, id, permit, tls, binding, timeout));
    }

    runtime.running.store(false, Ordering::SeqCst);
    tracing::info!(listener = runtime.label, "accept loop stopped");
}

/// Worker for one accepted connection.
///
/// The permit and socket are owned here, so whichever way the worker exits
/// they are released when it returns.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    id: ConnectionId,
    permit: OwnedSemaphorePermit,
    tls: Option<TlsAcceptor>,
    binding: Arc<SessionBinding>,
    header_read_timeout: Duration,
) {
    let _permit = permit;

    match tls {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(stream) => pump(stream, peer, id, binding, header_read_timeout).await,
            Err(e) => {
                // A client without an acceptable certificate fails here,
                // before any request is dispatched.
                tracing::debug!(connection_id = %id, peer = %peer, error = %e, "TLS handshake failed");
            }
        },
        None => pump(stream, peer, id, binding, header_read_timeout).await,
    }

    tracing::trace!(connection_id = %id, "connection closed");
}

/// Pump request/response cycles through hyper until the connection ends.
async fn pump<S>(
    stream: S,
    peer: SocketAddr,
    id: ConnectionId,
    binding: Arc<SessionBinding>,
    header_read_timeout: Duration,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |request| {
        let binding = Arc::clone(&binding);
        async move {
            Ok::<_, std::convert::Infallible>(binding.dispatch(peer, request).await)
        }
    });

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(header_read_timeout);
    let result = builder
        .serve_connection(TokioIo::new(stream), service)
        .await;

    if let Err(e) = result {
        if e.is_incomplete_message() {
            // Peer went away mid-request; normal enough at this layer.
            tracing::trace!(connection_id = %id, "peer disconnected");
        } else {
            tracing::debug!(connection_id = %id, peer = %peer, error = %e, "connection error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
