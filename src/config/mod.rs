//! Configuration: schema, validation, and loading.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, LoadError};
pub use schema::ServerConfig;
pub use validation::{keys, password_from_env, validate, ConfigError, Settings, PASSWORD_ENV};
