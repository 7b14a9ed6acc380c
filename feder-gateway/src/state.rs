//! The state a running gateway serves from.

use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic;
use feder_federation::MergedSchema;
use feder_federation::SubgraphDescriptor;
use feder_federation::SubgraphSchema;
use feder_federation::SubgraphSchemaBuilder;
use feder_federation::graphql;
use feder_federation::merge_subgraphs;
use futures::future::try_join_all;
use parking_lot::RwLock;

use crate::configuration::Configuration;
use crate::error::GatewayError;
use crate::execution::execute;
use crate::execution::executable_schema;
use crate::services::HttpSubgraphClient;
use crate::services::http_client;

/// The merged schema and the engine executing client operations against it.
///
/// Built once, before serving, and never mutated afterwards.
pub struct GatewayState {
    merged: MergedSchema,
    schema: dynamic::Schema,
    sdl: String,
}

impl GatewayState {
    /// Discovers every configured subgraph over HTTP and merges them, in configuration order.
    pub async fn build(configuration: &Configuration) -> Result<Self, GatewayError> {
        let http_client = http_client()?;
        let descriptors = configuration
            .subgraphs
            .iter()
            .map(|(name, url)| {
                SubgraphDescriptor::new(
                    name.clone(),
                    url.clone(),
                    Arc::new(HttpSubgraphClient::new(
                        name.clone(),
                        url.clone(),
                        http_client.clone(),
                    )),
                )
            })
            .collect();
        Self::from_descriptors(descriptors).await
    }

    /// Fetches the schema of every subgraph concurrently. Any failure aborts the build.
    pub async fn from_descriptors(
        descriptors: Vec<SubgraphDescriptor>,
    ) -> Result<Self, GatewayError> {
        let subgraphs = try_join_all(
            descriptors
                .into_iter()
                .map(|descriptor| SubgraphSchemaBuilder::new(descriptor).build()),
        )
        .await?;
        Self::from_subgraph_schemas(&subgraphs)
    }

    pub fn from_subgraph_schemas(subgraphs: &[SubgraphSchema]) -> Result<Self, GatewayError> {
        let merged = merge_subgraphs(subgraphs)?;
        let schema = executable_schema(&merged)?;
        let sdl = merged.sdl();
        tracing::info!(
            subgraphs = subgraphs.len(),
            federated_fields = merged.resolvers().count(),
            "merged schema is ready"
        );
        tracing::debug!(%sdl, "merged schema");
        Ok(Self {
            merged,
            schema,
            sdl,
        })
    }

    pub fn merged_schema(&self) -> &MergedSchema {
        &self.merged
    }

    /// The merged schema, printed as SDL.
    pub fn schema_sdl(&self) -> &str {
        &self.sdl
    }

    pub async fn execute(&self, request: graphql::Request) -> graphql::Response {
        execute(&self.schema, request).await
    }
}

impl fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayState")
            .field("merged", &self.merged)
            .finish_non_exhaustive()
    }
}

/// Shared access to the current [`GatewayState`].
///
/// Requests keep the state they started with; [`StateHandle::swap`] only affects later ones.
#[derive(Clone, Debug)]
pub struct StateHandle {
    state: Arc<RwLock<Arc<GatewayState>>>,
}

impl StateHandle {
    pub fn new(state: GatewayState) -> Self {
        Self {
            state: Arc::new(RwLock::new(Arc::new(state))),
        }
    }

    pub fn current(&self) -> Arc<GatewayState> {
        self.state.read().clone()
    }

    /// Replaces the state, returning the previous one.
    pub fn swap(&self, state: GatewayState) -> Arc<GatewayState> {
        std::mem::replace(&mut *self.state.write(), Arc::new(state))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;

    use super::*;
    use crate::test_support::CannedClient;
    use crate::test_support::subgraph;

    const PRODUCTS_SDL: &str = r#"
type Query {
  product(id: ID!): Product
}

type Product @key(fields: "id") {
  id: ID!
  name: String
}
"#;

    const PRICES_SDL: &str = r#"
type Query {
  product(id: ID!): Product
}

type Product @key(fields: "id") {
  id: ID!
  price: Float
}
"#;

    const CATALOG_SDL: &str = r#"
type Query {
  product(id: ID!): Product
}

type Product @key(fields: "id") {
  id: ID!
  name: String
}
"#;

    fn state(products: &CannedClient, prices: &CannedClient) -> GatewayState {
        GatewayState::from_subgraph_schemas(&[
            subgraph("products", PRODUCTS_SDL, products.clone()),
            subgraph("prices", PRICES_SDL, prices.clone()),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn disjoint_fields_hit_their_own_subgraph() {
        let products = CannedClient::default();
        let prices = CannedClient::default().with_entity(json!({"id": "1", "price": 9.5}));
        let state = state(&products, &prices);

        let response = state
            .execute(graphql::Request::new(r#"{ product(id: "1") { id price } }"#))
            .await;

        assert_eq!(
            response.data,
            Some(json!({"product": {"id": "1", "price": 9.5}}))
        );
        assert!(products.requests().is_empty());
        assert_eq!(prices.requests().len(), 1);
    }

    #[tokio::test]
    async fn first_subgraph_fields_skip_the_second() {
        let products = CannedClient::default().with_entity(json!({"name": "Table"}));
        let prices = CannedClient::default();
        let state = state(&products, &prices);

        let response = state
            .execute(graphql::Request::new(r#"{ product(id: "1") { name } }"#))
            .await;

        assert_eq!(response.data, Some(json!({"product": {"name": "Table"}})));
        assert_eq!(products.requests().len(), 1);
        assert!(prices.requests().is_empty());
    }

    #[tokio::test]
    async fn typename_and_id_are_answered_locally() {
        let products = CannedClient::default();
        let prices = CannedClient::default();
        let state = state(&products, &prices);

        let response = state
            .execute(graphql::Request::new(
                r#"{ product(id: "1") { __typename id } }"#,
            ))
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data,
            Some(json!({"product": {"__typename": "Product", "id": "1"}}))
        );
        assert!(products.requests().is_empty());
        assert!(prices.requests().is_empty());
    }

    #[tokio::test]
    async fn shared_fields_take_the_last_subgraph_value() {
        let products = CannedClient::default().with_entity(json!({"name": "from products"}));
        let catalog = CannedClient::default().with_entity(json!({"name": "from catalog"}));
        let state = GatewayState::from_subgraph_schemas(&[
            subgraph("products", PRODUCTS_SDL, products.clone()),
            subgraph("catalog", CATALOG_SDL, catalog.clone()),
        ])
        .unwrap();

        let response = state
            .execute(graphql::Request::new(r#"{ product(id: "1") { name } }"#))
            .await;

        assert_eq!(
            response.data,
            Some(json!({"product": {"name": "from catalog"}}))
        );
        assert_eq!(products.requests().len(), 1);
        assert_eq!(catalog.requests().len(), 1);
    }

    #[test]
    fn prints_the_merged_schema() {
        let state = state(&CannedClient::default(), &CannedClient::default());

        let sdl = state.schema_sdl();
        assert!(sdl.contains("type Product"), "{sdl}");
        assert!(sdl.contains("price: Float"), "{sdl}");
        assert!(!sdl.contains("_entities"), "{sdl}");
        let resolvers: Vec<_> = state
            .merged_schema()
            .resolvers()
            .map(|(coordinate, resolver)| (coordinate.to_string(), resolver.subgraphs()))
            .collect();
        let expected = [("Query.product".to_string(), vec!["products", "prices"])];
        assert_eq!(resolvers, expected);
    }

    #[test]
    fn swap_replaces_the_current_state() {
        let handle = StateHandle::new(state(&CannedClient::default(), &CannedClient::default()));
        let before = handle.current();

        let products = subgraph("products", PRODUCTS_SDL, CannedClient::default());
        let only_products = GatewayState::from_subgraph_schemas(&[products]).unwrap();
        let previous = handle.swap(only_products);

        assert!(Arc::ptr_eq(&before, &previous));
        assert!(!handle.current().schema_sdl().contains("price"));
        assert!(before.schema_sdl().contains("price"));
    }
}
