//! Gateway errors.
use std::net::SocketAddr;

use displaydoc::Display;
use feder_federation::FederationError;
use thiserror::Error;

use crate::configuration::ConfigurationError;

/// Errors that keep the gateway from starting or serving.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    /// {0}
    Federation(#[from] FederationError),

    /// could not build the executable schema: {0}
    Engine(String),

    /// {0}
    Configuration(#[from] ConfigurationError),

    /// could not create the HTTP client: {0}
    HttpClient(#[from] reqwest::Error),

    /// could not listen on {address}: {error}
    Bind {
        address: SocketAddr,
        error: std::io::Error,
    },

    /// http server failed: {0}
    Serve(std::io::Error),
}
