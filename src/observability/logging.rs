//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Keep the access-log target stable for log-scraping tooling
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via `RUST_LOG`
//! - Access-log lines are emitted on a dedicated target so deployments can
//!   route or silence them independently of diagnostic output

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Target used for the per-request access-log line.
///
/// The line format is a compatibility contract:
/// `<remote-ip> - <session-id> "<method> <uri> <protocol>" <status-code>`
pub const ACCESS_LOG_TARGET: &str = "anteroom::access";

/// Initialize the tracing subscriber.
///
/// Honors `RUST_LOG` when set; otherwise defaults to `info` for this crate.
/// Safe to call once per process; embedding applications that install their
/// own subscriber should skip this.
pub fn init(default_directive: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
