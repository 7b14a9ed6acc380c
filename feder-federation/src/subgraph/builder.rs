use std::sync::Arc;

use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::UnionType;
use indexmap::IndexMap;

use crate::entity_fetcher::SubgraphEntityFetcher;
use crate::error::FederationError;
use crate::error::SchemaFetchingError;
use crate::field_set::coerce_field_sets;
use crate::resolver::FieldCoordinate;
use crate::resolver::Resolver;
use crate::subgraph::SubgraphDescriptor;
use crate::subgraph::SubgraphSchema;
use crate::subgraph::entity::EntityClassifier;
use crate::subgraph::fetcher::SubgraphSchemaFetcher;
use crate::subgraph::spec::ENTITIES_QUERY;
use crate::subgraph::spec::ENTITY_UNION_NAME;
use crate::subgraph::spec::QUERY_TYPE_NAME;
use crate::subgraph::spec::is_federation_name;
use crate::subgraph::spec::with_preamble;

/// Turns a subgraph descriptor into its augmented, validated schema.
///
/// Every field of the subgraph's root `Query` type is bound to the subgraph's
/// [`SubgraphEntityFetcher`].
pub struct SubgraphSchemaBuilder {
    descriptor: SubgraphDescriptor,
}

impl SubgraphSchemaBuilder {
    pub fn new(descriptor: SubgraphDescriptor) -> Self {
        Self { descriptor }
    }

    /// Fetches the subgraph SDL through `_service` and builds the schema from it.
    pub async fn build(self) -> Result<SubgraphSchema, FederationError> {
        let sdl = SubgraphSchemaFetcher::new(&self.descriptor).fetch().await?;
        self.build_from_augmented(sdl)
    }

    /// Builds the schema from an SDL the subgraph published, without any network call.
    pub fn build_from_sdl(self, sdl: &str) -> Result<SubgraphSchema, FederationError> {
        self.build_from_augmented(with_preamble(sdl))
    }

    fn build_from_augmented(self, source: String) -> Result<SubgraphSchema, FederationError> {
        let descriptor = self.descriptor;
        let invalid = |message: String| SchemaFetchingError::InvalidSchema {
            service: descriptor.name.clone(),
            url: descriptor.url.to_string(),
            message,
        };

        let mut schema = Schema::builder()
            .adopt_orphan_extensions()
            .parse(source, format!("{}.graphql", descriptor.name))
            .build()
            .map_err(|errors| invalid(errors.to_string()))?;

        coerce_field_sets(&schema)?;
        let entities = EntityClassifier::entities(&descriptor.name, &schema)?;

        if entities.is_empty() {
            // `_Entity` would be an empty union
            if let Some(ExtendedType::Object(query)) = schema.types.get_mut(&QUERY_TYPE_NAME) {
                query.make_mut().fields.shift_remove(&ENTITIES_QUERY);
            }
        } else {
            schema.types.insert(
                ENTITY_UNION_NAME,
                ExtendedType::Union(Node::new(UnionType {
                    description: None,
                    name: ENTITY_UNION_NAME,
                    directives: Default::default(),
                    members: entities.iter().cloned().map(ComponentName::from).collect(),
                })),
            );
        }
        schema
            .schema_definition
            .make_mut()
            .query
            .get_or_insert(ComponentName::from(QUERY_TYPE_NAME));

        let schema = schema.validate().map_err(|errors| invalid(errors.to_string()))?;
        let schema = Arc::new(schema);
        tracing::debug!(
            subgraph = %descriptor.name,
            entities = ?entities,
            "built subgraph schema"
        );

        let fetcher = Arc::new(SubgraphEntityFetcher::new(
            descriptor.clone(),
            Arc::clone(&schema),
        ));
        let resolvers: IndexMap<FieldCoordinate, Resolver> = schema
            .get_object(&QUERY_TYPE_NAME)
            .into_iter()
            .flat_map(|query| query.fields.keys())
            .filter(|field_name| !is_federation_name(field_name))
            .map(|field_name| {
                (
                    FieldCoordinate::new(QUERY_TYPE_NAME, field_name.clone()),
                    Resolver::single(descriptor.name.as_str(), fetcher.clone()),
                )
            })
            .collect();

        Ok(SubgraphSchema {
            descriptor,
            schema,
            entities,
            resolvers,
        })
    }
}
