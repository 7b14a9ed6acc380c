use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::graphql::Request;
use crate::graphql::Response;
use crate::subgraph::SubgraphClient;
use crate::subgraph::SubgraphDescriptor;
use crate::subgraph::SubgraphSchema;
use crate::subgraph::SubgraphSchemaBuilder;
use crate::subgraph::TransportError;

type Canned = Result<Option<Response>, TransportError>;

/// A subgraph client answering with canned responses, in order, and recording what it was sent.
#[derive(Clone, Default)]
pub(crate) struct StubClient {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    responses: VecDeque<Canned>,
    requests: Vec<Request>,
}

impl StubClient {
    pub(crate) fn with_response(self, response: Response) -> Self {
        self.push(Ok(Some(response)))
    }

    pub(crate) fn with_empty_response(self) -> Self {
        self.push(Ok(None))
    }

    pub(crate) fn with_transport_error(self, reason: &str) -> Self {
        self.push(Err(TransportError::Fetch(reason.to_string())))
    }

    fn push(self, canned: Canned) -> Self {
        self.inner.lock().unwrap().responses.push_back(canned);
        self
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.query).collect()
    }
}

#[async_trait]
impl SubgraphClient for StubClient {
    async fn request(&self, request: Request) -> Result<Option<Response>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request);
        inner
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Fetch("no canned response".to_string())))
    }
}

pub(crate) fn descriptor(name: &str, client: StubClient) -> SubgraphDescriptor {
    SubgraphDescriptor::new(
        name,
        format!("http://{name}.test/graphql").parse().unwrap(),
        Arc::new(client),
    )
}

/// Builds a subgraph schema from an SDL, as if `_service` had returned it.
pub(crate) fn subgraph(name: &str, sdl: &str, client: StubClient) -> SubgraphSchema {
    SubgraphSchemaBuilder::new(descriptor(name, client)).build_from_sdl(sdl).unwrap()
}

pub(crate) const PRODUCTS_SDL: &str = r#"
type Query {
  product(id: ID!): Product
}

type Product @key(fields: "id") {
  id: ID!
  name: String
  description: String
}
"#;

pub(crate) const PRICES_SDL: &str = r#"
type Query {
  product(id: ID!): Product
}

type Product @key(fields: "id") {
  id: ID!
  price: Price
}

type Price {
  amount: Float
  tag(locale: String): String
  currency: Currency
}

enum Currency {
  EUR
  USD
}
"#;
