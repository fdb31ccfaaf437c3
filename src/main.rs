//! Anteroom server binary.
//!
//! Loads a TOML settings file, validates it, builds the server, and runs
//! until Ctrl+C. Real deployments embed the library and register their own
//! handlers; this binary wires in a single status handler as a minimal
//! front door.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use http::StatusCode;

use anteroom::http::handler::plain_response;
use anteroom::{
    Handler, HandlerMap, HandlerRequest, HandlerResponse, ListenerBindings, Server, Session,
};

#[derive(Parser)]
#[command(name = "anteroom")]
#[command(about = "Session- and auth-aware embeddable application server", long_about = None)]
struct Cli {
    /// Path to the TOML settings file.
    #[arg(short, long, default_value = "anteroom.toml")]
    config: PathBuf,
}

/// Minimal built-in handler proving the server is up.
struct StatusHandler;

#[async_trait]
impl Handler for StatusHandler {
    async fn handle(
        &self,
        _request: HandlerRequest,
        _session: Arc<Session>,
    ) -> Result<HandlerResponse, anteroom::http::HandlerError> {
        Ok(plain_response(StatusCode::OK, "anteroom is running\n"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    anteroom::observability::logging::init("anteroom=info");

    let cli = Cli::parse();
    let config = anteroom::config::load_config(&cli.config)?;

    tracing::info!(
        home = %config.home.display(),
        tls_port = ?config.tls_port,
        plain_port = ?config.plain_port,
        auth_mode = ?config.auth_mode,
        "configuration loaded"
    );

    let mut handlers = HandlerMap::new();
    handlers.register("/status", Arc::new(StatusHandler));

    let mut server = Server::new(config, ListenerBindings::shared(Arc::new(handlers)))?;
    server.start().await;

    if !server.is_running() {
        tracing::error!("no listener came up; exiting");
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    server.stop().await;
    tracing::info!("shutdown complete");
    Ok(())
}
