//! Access-log contract: one INFO record per request in the fixed format,
//! none when the effective level is above INFO.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use anteroom::http::SessionBinding;
use anteroom::session::{CacheConfig, SessionCache};
use anteroom::AuthMode;

mod common;

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn binding() -> SessionBinding {
    let cache = Arc::new(SessionCache::new(CacheConfig {
        lifetime: Duration::from_secs(60),
        purge_interval: Duration::from_secs(60),
    }));
    SessionBinding::new(cache, common::echo_handlers(), AuthMode::None, "SID")
}

fn request() -> Request<Full<Bytes>> {
    Request::builder()
        .uri("/session")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn remote() -> SocketAddr {
    "192.0.2.7:55000".parse().unwrap()
}

#[tokio::test]
async fn one_info_record_per_request_in_fixed_format() {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(capture.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let binding = binding();
    let response = binding.dispatch(remote(), request()).await;
    let status = response.status().as_u16();

    let output = capture.contents();
    let access_lines: Vec<&str> = output
        .lines()
        .filter(|l| l.contains("anteroom::access"))
        .collect();
    assert_eq!(access_lines.len(), 1);

    let line = access_lines[0];
    // <remote-ip> - <session-id> "<method> <uri> <protocol>" <status-code>
    assert!(line.contains("192.0.2.7 - "));
    assert!(line.contains("\"GET /session HTTP/1.1\""));
    assert!(line.ends_with(&format!(" {status}")) || line.contains(&format!("\" {status}")));
    // The remote address appears bare, without a port or brackets.
    assert!(!line.contains("192.0.2.7:55000"));
}

#[tokio::test]
async fn no_records_when_level_is_above_info() {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_writer(capture.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let binding = binding();
    binding.dispatch(remote(), request()).await;

    let output = capture.contents();
    assert!(
        !output.contains("anteroom::access"),
        "no access record may be emitted above INFO"
    );
}
