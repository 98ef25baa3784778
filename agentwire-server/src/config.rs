//! Environment configuration for hosting an agent server.

use std::net::SocketAddr;

use crate::router::DEFAULT_BASE_PATH;

/// Environment variable holding the listen address.
pub const BIND_ENV: &str = "AGENTWIRE_BIND";

/// Environment variable holding the route prefix.
pub const BASE_PATH_ENV: &str = "AGENTWIRE_BASE_PATH";

/// Listen address used when `AGENTWIRE_BIND` is unset.
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Errors reading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid socket address: '{value}'")]
    InvalidBind { name: &'static str, value: String },
}

/// Where and under which prefix to serve agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub base_path: String,
}

impl ServerConfig {
    /// Read `AGENTWIRE_BIND` and `AGENTWIRE_BASE_PATH`, using defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_value = lookup(BIND_ENV).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_value
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBind {
                name: BIND_ENV,
                value: bind_value.clone(),
            })?;
        let base_path = lookup(BASE_PATH_ENV).unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());

        Ok(Self { bind, base_path })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }
}
