//! TLS identity construction.
//!
//! # Responsibilities
//! - Open the keystore under `<home>/etc/keystore` with the externally
//!   sourced password
//! - Locate the server's signing identity under the fixed alias
//! - Produce a rustls server context that always presents that identity
//! - Demand a client certificate when the auth mode is `certificate`
//!
//! # Design Decisions
//! - Alias pinning is a tiny [`ResolvesServerCert`] adapter around the
//!   parsed identity, not a key-manager subclass: generic resolvers may
//!   pick an alias inconsistent with this server's single-identity model
//! - Trust for *client* certificates comes from `<home>/etc/truststore`
//!   (PEM bundle); rustls has no ambient platform trust store for that
//!   role, so the path is the out-of-band override point

use std::fmt;
use std::sync::Arc;

use rustls::crypto::ring::sign::any_supported_type;
use rustls::server::{ClientHello, ResolvesServerCert, WebPkiClientVerifier};
use rustls::sign::CertifiedKey;
use rustls::RootCertStore;

use crate::auth::AuthMode;
use crate::config::{ConfigError, ServerConfig};
use crate::tls::keystore::{Keystore, KeystoreError, SERVER_IDENTITY_ALIAS};

/// Certificate resolver that always presents the fixed identity alias,
/// irrespective of SNI or the signature schemes offered in the hello.
pub struct FixedIdentityResolver {
    alias: &'static str,
    key: Arc<CertifiedKey>,
}

impl FixedIdentityResolver {
    fn new(key: CertifiedKey) -> Self {
        Self {
            alias: SERVER_IDENTITY_ALIAS,
            key: Arc::new(key),
        }
    }
}

impl fmt::Debug for FixedIdentityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedIdentityResolver")
            .field("alias", &self.alias)
            .finish()
    }
}

impl ResolvesServerCert for FixedIdentityResolver {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.key))
    }
}

/// Build the TLS server context for `config` using `password` to open the
/// keystore.
///
/// The password is threaded through explicitly; see
/// [`crate::config::password_from_env`] for the environment-sourced
/// variant. Every failure here is a configuration error: the server must
/// not start with a broken identity.
pub fn build_tls_context(
    config: &ServerConfig,
    password: &str,
) -> Result<Arc<rustls::ServerConfig>, ConfigError> {
    let keystore_path = config.keystore_path();
    let keystore = Keystore::load(&keystore_path, password)?;
    let entry = keystore.require_entry(SERVER_IDENTITY_ALIAS)?;

    let certs = entry.certificates()?;
    let key_der = entry.private_key()?;
    let signing_key = any_supported_type(&key_der).map_err(|e| KeystoreError::BadEntry {
        alias: SERVER_IDENTITY_ALIAS.to_string(),
        reason: format!("unsupported key type: {e}"),
    })?;
    let resolver = FixedIdentityResolver::new(CertifiedKey::new(certs, signing_key));

    let builder = if config.auth_mode == AuthMode::Certificate {
        let verifier = WebPkiClientVerifier::builder(Arc::new(client_roots(config)?))
            .build()
            .map_err(|e| ConfigError::Tls(e.to_string()))?;
        rustls::ServerConfig::builder().with_client_cert_verifier(verifier)
    } else {
        rustls::ServerConfig::builder().with_no_client_auth()
    };

    Ok(Arc::new(builder.with_cert_resolver(Arc::new(resolver))))
}

/// Load the CA roots a `certificate`-mode deployment trusts for clients.
fn client_roots(config: &ServerConfig) -> Result<RootCertStore, ConfigError> {
    let path = config.truststore_path();
    let pem = std::fs::read(&path).map_err(|_| ConfigError::MissingTruststore(path.clone()))?;

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut pem.as_slice()) {
        let cert = cert.map_err(|e| ConfigError::Tls(format!("unreadable truststore: {e}")))?;
        roots
            .add(cert)
            .map_err(|e| ConfigError::Tls(format!("rejected trust anchor: {e}")))?;
    }
    if roots.is_empty() {
        return Err(ConfigError::Tls(format!(
            "truststore `{}` holds no certificates",
            path.display()
        )));
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::keystore::self_signed_entry;

    fn home_with_keystore(password: &str, alias: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let entry = self_signed_entry(alias, vec!["localhost".into()]).unwrap();
        Keystore::create(&dir.path().join("etc").join("keystore"), password, vec![entry]).unwrap();
        dir
    }

    #[test]
    fn builds_context_from_keystore() {
        let home = home_with_keystore("pw", SERVER_IDENTITY_ALIAS);
        let config = ServerConfig::for_home(home.path());
        build_tls_context(&config, "pw").unwrap();
    }

    #[test]
    fn missing_keystore_reports_the_file() {
        let home = tempfile::tempdir().unwrap();
        let config = ServerConfig::for_home(home.path());
        let err = build_tls_context(&config, "pw").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Keystore(KeystoreError::NotFound(_))
        ));
    }

    #[test]
    fn wrong_password_reports_mac_mismatch() {
        let home = home_with_keystore("right", SERVER_IDENTITY_ALIAS);
        let config = ServerConfig::for_home(home.path());
        assert!(matches!(
            build_tls_context(&config, "wrong").unwrap_err(),
            ConfigError::Keystore(KeystoreError::BadPassword(_))
        ));
    }

    #[test]
    fn missing_alias_names_alias_and_keystore() {
        let home = home_with_keystore("pw", "other-identity");
        let config = ServerConfig::for_home(home.path());
        let err = build_tls_context(&config, "pw").unwrap_err();
        assert!(err.to_string().contains(SERVER_IDENTITY_ALIAS));
    }

    #[test]
    fn certificate_mode_requires_a_truststore() {
        let home = home_with_keystore("pw", SERVER_IDENTITY_ALIAS);
        let mut config = ServerConfig::for_home(home.path());
        config.auth_mode = AuthMode::Certificate;
        assert!(matches!(
            build_tls_context(&config, "pw").unwrap_err(),
            ConfigError::MissingTruststore(_)
        ));
    }

    #[test]
    fn certificate_mode_accepts_a_pem_truststore() {
        let home = home_with_keystore("pw", SERVER_IDENTITY_ALIAS);
        let mut config = ServerConfig::for_home(home.path());
        config.auth_mode = AuthMode::Certificate;

        // Trust our own self-signed certificate as the client CA.
        let store = Keystore::load(&config.keystore_path(), "pw").unwrap();
        let pem = store.require_entry(SERVER_IDENTITY_ALIAS).unwrap().cert_pem.clone();
        std::fs::write(config.truststore_path(), pem).unwrap();

        build_tls_context(&config, "pw").unwrap();
    }
}
