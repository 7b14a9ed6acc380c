//! Logic for loading configuration in to an object model

use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use displaydoc::Display;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;


/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file {path}: {error}
    CannotRead { path: String, error: std::io::Error },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration for the gateway.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Configuration options pertaining to the http server component.
    #[serde(default)]
    pub server: Server,

    /// Subgraph name to GraphQL endpoint, in the order schemas are merged.
    pub subgraphs: IndexMap<String, Url>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

fn default_path() -> String {
    String::from("/graphql")
}

/// Configuration options pertaining to the http server component.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Server {
    /// The socket address and port to listen on.
    /// Defaults to 127.0.0.1:4000
    pub listen: SocketAddr,

    /// The HTTP path of the GraphQL endpoint.
    /// Defaults to /graphql
    pub path: String,

    /// The HTTP path of the health check endpoint.
    /// Defaults to /health
    pub health_check_path: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            health_check_path: String::from("/health"),
        }
    }
}

impl Configuration {
    /// Reads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigurationError::CannotRead {
            path: path.display().to_string(),
            error,
        })?;
        raw.parse()
    }

    fn validate(self) -> Result<Self, ConfigurationError> {
        if self.subgraphs.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "no subgraphs configured",
                error: "at least one subgraph is required".to_string(),
            });
        }
        for path in [&self.server.path, &self.server.health_check_path] {
            if !path.starts_with('/') {
                return Err(ConfigurationError::InvalidConfiguration {
                    message: "invalid server path",
                    error: format!("'{path}' must start with '/'"),
                });
            }
        }
        if self.server.path == self.server.health_check_path {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid server path",
                error: "the GraphQL and health check paths must differ".to_string(),
            });
        }
        for (name, url) in &self.subgraphs {
            if name.trim().is_empty() {
                return Err(ConfigurationError::InvalidConfiguration {
                    message: "invalid subgraph name",
                    error: "subgraph names must not be empty".to_string(),
                });
            }
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigurationError::InvalidConfiguration {
                    message: "invalid subgraph url",
                    error: format!("{name}: unsupported scheme '{}'", url.scheme()),
                });
            }
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str::<Configuration>(s)
            .map_err(ConfigurationError::DeserializeConfigError)?
            .validate()
    }
}
