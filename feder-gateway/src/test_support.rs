use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use feder_federation::SubgraphDescriptor;
use feder_federation::SubgraphSchema;
use feder_federation::SubgraphSchemaBuilder;
use feder_federation::graphql::Request;
use feder_federation::graphql::Response;
use feder_federation::subgraph::SubgraphClient;
use feder_federation::subgraph::TransportError;
use serde_json_bytes::Value;
use serde_json_bytes::json;

/// Answers `_entities` requests from a queue and records every request.
///
/// An exhausted queue fails like an unreachable subgraph.
#[derive(Clone, Default)]
pub(crate) struct CannedClient {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    responses: VecDeque<Response>,
    requests: Vec<Request>,
}

impl CannedClient {
    pub(crate) fn with_entity(self, entity: Value) -> Self {
        self.inner
            .lock()
            .unwrap()
            .responses
            .push_back(Response::from_data(json!({"_entities": [entity]})));
        self
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.inner.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl SubgraphClient for CannedClient {
    async fn request(&self, request: Request) -> Result<Option<Response>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request);
        match inner.responses.pop_front() {
            Some(response) => Ok(Some(response)),
            None => Err(TransportError::Fetch("connection refused".to_string())),
        }
    }
}

/// Builds a subgraph schema from an SDL, as if `_service` had returned it.
pub(crate) fn subgraph(name: &str, sdl: &str, client: CannedClient) -> SubgraphSchema {
    let descriptor = SubgraphDescriptor::new(
        name,
        format!("http://{name}.test/graphql").parse().unwrap(),
        Arc::new(client),
    );
    SubgraphSchemaBuilder::new(descriptor).build_from_sdl(sdl).unwrap()
}
