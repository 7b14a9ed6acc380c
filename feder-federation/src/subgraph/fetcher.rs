use std::time::Instant;

use serde_json_bytes::Value;

use crate::error::SchemaFetchingError;
use crate::graphql;
use crate::subgraph::SubgraphDescriptor;
use crate::subgraph::spec::SERVICE_SDL_OPERATION;
use crate::subgraph::spec::with_preamble;

/// Retrieves the SDL a subgraph publishes through `_service`.
pub struct SubgraphSchemaFetcher<'a> {
    descriptor: &'a SubgraphDescriptor,
}

impl<'a> SubgraphSchemaFetcher<'a> {
    pub fn new(descriptor: &'a SubgraphDescriptor) -> Self {
        Self { descriptor }
    }

    /// Fetches the subgraph SDL and prepends the federation preamble.
    pub async fn fetch(&self) -> Result<String, SchemaFetchingError> {
        let service = self.descriptor.name.clone();
        let url = self.descriptor.url.to_string();
        let started = Instant::now();

        let response = self
            .descriptor
            .client
            .request(graphql::Request::new(SERVICE_SDL_OPERATION))
            .await
            .map_err(|error| SchemaFetchingError::Transport {
                service: service.clone(),
                url: url.clone(),
                reason: error.to_string(),
            })?;

        let sdl = extract_sdl(response).map_err(|kind| kind.into_error(service.clone(), url))?;
        tracing::debug!(
            subgraph = %service,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched subgraph schema"
        );
        tracing::debug!(subgraph = %service, "{sdl}");

        Ok(with_preamble(&sdl))
    }
}

enum Failure {
    NullResponse,
    Errors(String),
    NoData,
    NoService,
}

impl Failure {
    fn into_error(self, service: String, url: String) -> SchemaFetchingError {
        match self {
            Failure::NullResponse => SchemaFetchingError::NullResponse { service, url },
            Failure::Errors(errors) => SchemaFetchingError::Errors {
                service,
                url,
                errors,
            },
            Failure::NoData => SchemaFetchingError::NoData { service, url },
            Failure::NoService => SchemaFetchingError::NoService { service, url },
        }
    }
}

fn extract_sdl(response: Option<graphql::Response>) -> Result<String, Failure> {
    let response = response.ok_or(Failure::NullResponse)?;
    if response.has_errors() {
        return Err(Failure::Errors(response.error_messages()));
    }
    let data = response.data.ok_or(Failure::NoData)?;
    match data.get("_service").and_then(|service| service.get("sdl")) {
        Some(Value::String(sdl)) => Ok(sdl.as_str().to_string()),
        _ => Err(Failure::NoService),
    }
}
