use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::validation::Valid;
use async_trait::async_trait;
use displaydoc::Display;
use indexmap::IndexMap;
use thiserror::Error;
use url::Url;

use crate::graphql;
use crate::resolver::FieldCoordinate;
use crate::resolver::Resolver;

mod builder;
pub mod entity;
pub mod fetcher;
pub mod spec;

pub use builder::SubgraphSchemaBuilder;

/// A transport failure talking to a subgraph.
///
/// Note that this relates to a transport error and not a GraphQL error.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// HTTP fetch failed: {0}
    Fetch(String),
    /// subgraph answered with status {status}: {reason}
    Status { status: u16, reason: String },
    /// response was malformed: {0}
    MalformedResponse(String),
}

/// The transport seam between the gateway and its subgraphs.
#[async_trait]
pub trait SubgraphClient: Send + Sync {
    /// Sends one GraphQL request. `Ok(None)` means the subgraph answered with an empty body.
    async fn request(
        &self,
        request: graphql::Request,
    ) -> Result<Option<graphql::Response>, TransportError>;
}

/// A configured subgraph.
#[derive(Clone)]
pub struct SubgraphDescriptor {
    pub name: String,
    pub url: Url,
    pub client: Arc<dyn SubgraphClient>,
}

impl SubgraphDescriptor {
    pub fn new(name: impl Into<String>, url: Url, client: Arc<dyn SubgraphClient>) -> Self {
        Self {
            name: name.into(),
            url,
            client,
        }
    }
}

impl fmt::Debug for SubgraphDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#"name: {}, url: {}"#, self.name, self.url)
    }
}

/// The augmented schema of one subgraph together with the resolvers of its root fields.
#[derive(Clone)]
pub struct SubgraphSchema {
    descriptor: SubgraphDescriptor,
    schema: Arc<Valid<Schema>>,
    entities: IndexSet<Name>,
    resolvers: IndexMap<FieldCoordinate, Resolver>,
}

impl SubgraphSchema {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &SubgraphDescriptor {
        &self.descriptor
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    /// The entity types of this subgraph, in declaration order.
    pub fn entities(&self) -> &IndexSet<Name> {
        &self.entities
    }

    pub fn resolver(&self, coordinate: &FieldCoordinate) -> Option<&Resolver> {
        self.resolvers.get(coordinate)
    }

    pub fn resolvers(&self) -> impl Iterator<Item = (&FieldCoordinate, &Resolver)> {
        self.resolvers.iter()
    }
}

impl fmt::Debug for SubgraphSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubgraphSchema")
            .field("descriptor", &self.descriptor)
            .field("entities", &self.entities)
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}
