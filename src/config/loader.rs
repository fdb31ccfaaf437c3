//! Configuration loading from disk.
//!
//! Reads a TOML file and flattens it into the string-keyed settings map the
//! validator consumes. Nested tables become dotted keys, so
//! `[server] tls_port = 8443` yields `server.tls_port = "8443"`.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate, ConfigError, Settings};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("could not parse `{path}`: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, LoadError> {
    let settings = load_settings(path)?;
    Ok(validate(&settings)?)
}

/// Load a TOML file into a flat settings map without validating it.
pub fn load_settings(path: &Path) -> Result<Settings, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let mut settings = Settings::new();
    flatten("", &value, &mut settings);
    Ok(settings)
}

fn flatten(prefix: &str, value: &toml::Value, out: &mut Settings) {
    match value {
        toml::Value::Table(table) => {
            for (key, value) in table {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&key, value, out);
            }
        }
        toml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}
