//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

use anteroom::http::handler::plain_response;
use anteroom::tls::keystore::{self_signed_entry, Keystore, SERVER_IDENTITY_ALIAS};
use anteroom::{
    Handler, HandlerMap, HandlerRequest, HandlerResponse, ServerConfig, Session,
};

/// Password used for every test keystore.
pub const TEST_PASSWORD: &str = "test-password";

/// Create a server home containing a bootstrapped keystore.
pub fn test_home() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let entry = self_signed_entry(SERVER_IDENTITY_ALIAS, vec!["localhost".into()]).unwrap();
    Keystore::create(&dir.path().join("etc").join("keystore"), TEST_PASSWORD, vec![entry])
        .unwrap();
    dir
}

/// Config with short session lifetimes suited to tests.
pub fn test_config(
    home: &tempfile::TempDir,
    tls_port: Option<u16>,
    plain_port: Option<u16>,
) -> ServerConfig {
    let mut config = ServerConfig::for_home(home.path());
    config.tls_port = tls_port;
    config.plain_port = plain_port;
    config.session_lifetime = Duration::from_secs(60);
    config.purge_interval = Duration::from_secs(60);
    config
}

/// Handler that answers with the bound session's id.
pub struct SessionEcho;

#[async_trait]
impl Handler for SessionEcho {
    async fn handle(
        &self,
        _request: HandlerRequest,
        session: Arc<Session>,
    ) -> Result<HandlerResponse, anteroom::http::HandlerError> {
        Ok(HandlerResponse::new(Full::new(Bytes::from(
            session.id().to_string(),
        ))))
    }
}

/// Handler standing in for restricted content.
pub struct PrivateContent;

#[async_trait]
impl Handler for PrivateContent {
    async fn handle(
        &self,
        _request: HandlerRequest,
        _session: Arc<Session>,
    ) -> Result<HandlerResponse, anteroom::http::HandlerError> {
        Ok(plain_response(StatusCode::OK, "private ok"))
    }
}

/// Handler map with `/session` echoing the session id.
pub fn echo_handlers() -> Arc<HandlerMap> {
    let mut map = HandlerMap::new();
    map.register("/session", Arc::new(SessionEcho));
    Arc::new(map)
}

/// Extract all Set-Cookie header values from a reqwest response.
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Pull the cookie value out of a `name=value; ...` Set-Cookie line.
pub fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap()
        .split_once('=')
        .unwrap()
        .1
        .to_string()
}
