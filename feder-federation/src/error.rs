//! Federation errors.
use displaydoc::Display;
use thiserror::Error;

/// Errors raised while discovering the schema of a subgraph.
///
/// Any of these keeps the gateway from starting.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaFetchingError {
    /// can't fetch GraphQL Federation schema from '{service}' at {url}: {reason}
    Transport {
        /// Name of the subgraph.
        service: String,
        /// Endpoint of the subgraph.
        url: String,
        /// The transport failure.
        reason: String,
    },

    /// null response while fetching the schema of '{service}' at {url}
    NullResponse { service: String, url: String },

    /// errors while fetching the schema of '{service}' at {url}: {errors}
    Errors {
        service: String,
        url: String,
        /// The error messages, joined.
        errors: String,
    },

    /// no data while fetching the schema of '{service}' at {url}
    NoData { service: String, url: String },

    /// no _service.sdl in the response of '{service}' at {url}
    NoService { service: String, url: String },

    /// invalid schema from '{service}' at {url}: {message}
    InvalidSchema {
        service: String,
        url: String,
        message: String,
    },
}

/// [from service {service} at {url}]: {kind}
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub struct FederationServiceError {
    /// Name of the subgraph that failed.
    pub service: String,
    /// Endpoint of the subgraph that failed.
    pub url: String,
    /// What went wrong.
    pub kind: ServiceErrorKind,
}

/// The ways an `_entities` round trip can fail.
#[derive(Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServiceErrorKind {
    /// null response
    NullResponse,
    /// transport failed: {0}
    Transport(String),
    /// {0}
    Errors(String),
    /// no data
    NoData,
    /// no _entities
    NoEntities,
    /// empty _entities
    EmptyEntities,
    /// multiple _entities ({0})
    MultipleEntities(usize),
    /// _entities element is {0}, not an object
    MalformedEntity(&'static str),
    /// no `id` argument to resolve {0}
    MissingIdentifier(String),
}

/// Failures coercing a `_FieldSet` literal.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// Expected AST type 'StringValue' or 'ListValue' but was '{0}'
    ExpectedStringOrList(String),
    /// Expected AST list containing 'StringValue' but was '{0}'
    ExpectedStringInList(String),
}

/// Umbrella error of the federation core.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FederationError {
    /// {0}
    SchemaFetching(#[from] SchemaFetchingError),

    /// {0}
    Service(#[from] FederationServiceError),

    /// {0}
    Coercion(#[from] CoercionError),

    /// unexpected json value type {shape} for field '{field}' of type {entity_type}: nested entities are not supported
    UnsupportedValue {
        entity_type: String,
        field: String,
        shape: &'static str,
    },

    /// invalid merged schema: {message}
    InvalidMergedSchema { message: String },
}

impl FederationError {
    /// Name of the subgraph this error comes from, if any.
    pub fn service(&self) -> Option<&str> {
        match self {
            FederationError::SchemaFetching(
                SchemaFetchingError::Transport { service, .. }
                | SchemaFetchingError::NullResponse { service, .. }
                | SchemaFetchingError::Errors { service, .. }
                | SchemaFetchingError::NoData { service, .. }
                | SchemaFetchingError::NoService { service, .. }
                | SchemaFetchingError::InvalidSchema { service, .. },
            ) => Some(service),
            FederationError::Service(error) => Some(&error.service),
            FederationError::Coercion(_)
            | FederationError::UnsupportedValue { .. }
            | FederationError::InvalidMergedSchema { .. } => None,
        }
    }
}
