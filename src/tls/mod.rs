//! TLS identity management: keystore container and context construction.

pub mod identity;
pub mod keystore;

pub use identity::build_tls_context;
pub use keystore::{Keystore, KeystoreEntry, KeystoreError, SERVER_IDENTITY_ALIAS};
