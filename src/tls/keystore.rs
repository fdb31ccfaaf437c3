//! Password-protected keystore holding the server's TLS identity.
//!
//! # Responsibilities
//! - Persist alias → (certificate chain, private key) entries as a single
//!   file under `<home>/etc/keystore`
//! - Detect a wrong password via an HMAC-SHA256 MAC over the entry payload
//! - Parse entry PEM material into rustls types
//!
//! # Design Decisions
//! - The container is TOML: human-inspectable, and the same crate already
//!   parses the server settings
//! - The MAC key is SHA-256 of the password, so the password itself is
//!   never written to disk
//! - Missing file, MAC mismatch, and missing alias are distinct errors so
//!   operators can tell misconfiguration apart from a bad password

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hmac::{Hmac, Mac};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// The fixed alias under which the server's identity is stored and always
/// selected during TLS handshakes.
pub const SERVER_IDENTITY_ALIAS: &str = "anteroom";

/// Error raised by keystore operations.
#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    #[error("keystore file `{0}` not found")]
    NotFound(PathBuf),

    #[error("keystore `{path}` could not be accessed: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[error("keystore `{path}` is not a valid store: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("keystore password check failed for `{0}` (MAC mismatch)")]
    BadPassword(PathBuf),

    #[error("alias `{alias}` not present in keystore `{path}`")]
    AliasNotFound { alias: String, path: PathBuf },

    #[error("keystore entry `{alias}` holds invalid material: {reason}")]
    BadEntry { alias: String, reason: String },
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    mac: String,
    #[serde(default, rename = "entry")]
    entries: Vec<KeystoreEntry>,
}

/// One identity in the store: an alias naming a PEM certificate chain and
/// its PEM private key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreEntry {
    pub alias: String,
    pub cert_pem: String,
    pub key_pem: String,
}

impl KeystoreEntry {
    /// Parse the entry's certificate chain.
    pub fn certificates(&self) -> Result<Vec<CertificateDer<'static>>, KeystoreError> {
        let certs: Vec<_> = rustls_pemfile::certs(&mut self.cert_pem.as_bytes())
            .collect::<Result<_, _>>()
            .map_err(|e| KeystoreError::BadEntry {
                alias: self.alias.clone(),
                reason: format!("unreadable certificate chain: {e}"),
            })?;
        if certs.is_empty() {
            return Err(KeystoreError::BadEntry {
                alias: self.alias.clone(),
                reason: "no certificates in PEM data".to_string(),
            });
        }
        Ok(certs)
    }

    /// Parse the entry's private key.
    pub fn private_key(&self) -> Result<PrivateKeyDer<'static>, KeystoreError> {
        rustls_pemfile::private_key(&mut self.key_pem.as_bytes())
            .map_err(|e| KeystoreError::BadEntry {
                alias: self.alias.clone(),
                reason: format!("unreadable private key: {e}"),
            })?
            .ok_or_else(|| KeystoreError::BadEntry {
                alias: self.alias.clone(),
                reason: "no private key in PEM data".to_string(),
            })
    }
}

/// An opened, MAC-verified keystore.
#[derive(Debug)]
pub struct Keystore {
    path: PathBuf,
    entries: Vec<KeystoreEntry>,
}

impl Keystore {
    /// Load and verify the keystore at `path`.
    pub fn load(path: &Path, password: &str) -> Result<Self, KeystoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(KeystoreError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(KeystoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let file: StoreFile = toml::from_str(&content).map_err(|e| KeystoreError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if file.mac != mac_hex(password, &file.entries) {
            return Err(KeystoreError::BadPassword(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries: file.entries,
        })
    }

    /// Write a keystore containing `entries`, MACed under `password`.
    ///
    /// The parent directory is created if necessary.
    pub fn create(
        path: &Path,
        password: &str,
        entries: Vec<KeystoreEntry>,
    ) -> Result<Self, KeystoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| KeystoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let file = StoreFile {
            mac: mac_hex(password, &entries),
            entries,
        };
        let content = toml::to_string_pretty(&file).map_err(|e| KeystoreError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, content).map_err(|source| KeystoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            entries: file.entries,
        })
    }

    /// Look up an entry by alias.
    pub fn entry(&self, alias: &str) -> Option<&KeystoreEntry> {
        self.entries.iter().find(|e| e.alias == alias)
    }

    /// Look up an entry by alias, failing with a diagnostic naming both the
    /// alias and the keystore path.
    pub fn require_entry(&self, alias: &str) -> Result<&KeystoreEntry, KeystoreError> {
        self.entry(alias).ok_or_else(|| KeystoreError::AliasNotFound {
            alias: alias.to_string(),
            path: self.path.clone(),
        })
    }

    /// All aliases in store order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.alias.as_str())
    }

    /// Path this store was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Generate a self-signed identity entry for bootstrap deployments.
pub fn self_signed_entry(
    alias: &str,
    hostnames: Vec<String>,
) -> Result<KeystoreEntry, rcgen::Error> {
    let generated = rcgen::generate_simple_self_signed(hostnames)?;
    Ok(KeystoreEntry {
        alias: alias.to_string(),
        cert_pem: generated.cert.pem(),
        key_pem: generated.key_pair.serialize_pem(),
    })
}

fn mac_hex(password: &str, entries: &[KeystoreEntry]) -> String {
    let key = Sha256::digest(password.as_bytes());
    let mut mac = HmacSha256::new_from_slice(&key).expect("HMAC accepts any key length");
    for entry in entries {
        mac.update(entry.alias.as_bytes());
        mac.update(&[0]);
        mac.update(entry.cert_pem.as_bytes());
        mac.update(&[0]);
        mac.update(entry.key_pem.as_bytes());
        mac.update(&[0]);
    }
    hex(&mac.finalize().into_bytes())
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("etc").join("keystore")
    }

    #[test]
    fn create_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let entry = self_signed_entry(SERVER_IDENTITY_ALIAS, vec!["localhost".into()]).unwrap();
        Keystore::create(&path, "hunter2", vec![entry]).unwrap();

        let store = Keystore::load(&path, "hunter2").unwrap();
        let entry = store.require_entry(SERVER_IDENTITY_ALIAS).unwrap();
        assert!(!entry.certificates().unwrap().is_empty());
        entry.private_key().unwrap();
    }

    #[test]
    fn missing_file_is_distinguishable_and_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let err = Keystore::load(&path, "pw").unwrap_err();
        assert!(matches!(err, KeystoreError::NotFound(_)));
        assert!(err.to_string().contains("keystore"));
    }

    #[test]
    fn wrong_password_is_a_mac_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let entry = self_signed_entry(SERVER_IDENTITY_ALIAS, vec!["localhost".into()]).unwrap();
        Keystore::create(&path, "correct", vec![entry]).unwrap();

        let err = Keystore::load(&path, "incorrect").unwrap_err();
        assert!(matches!(err, KeystoreError::BadPassword(_)));
    }

    #[test]
    fn missing_alias_names_alias_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let entry = self_signed_entry("someone-else", vec!["localhost".into()]).unwrap();
        Keystore::create(&path, "pw", vec![entry]).unwrap();

        let store = Keystore::load(&path, "pw").unwrap();
        let err = store.require_entry(SERVER_IDENTITY_ALIAS).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(SERVER_IDENTITY_ALIAS));
        assert!(msg.contains("keystore"));
    }

    #[test]
    fn tampered_entries_fail_the_mac_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let entry = self_signed_entry(SERVER_IDENTITY_ALIAS, vec!["localhost".into()]).unwrap();
        Keystore::create(&path, "pw", vec![entry]).unwrap();

        let content = fs::read_to_string(&path)
            .unwrap()
            .replace(SERVER_IDENTITY_ALIAS, "impostor");
        fs::write(&path, content).unwrap();

        assert!(matches!(
            Keystore::load(&path, "pw").unwrap_err(),
            KeystoreError::BadPassword(_)
        ));
    }
}
