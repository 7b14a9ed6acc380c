//! Resolution of one entity against one subgraph through `_entities`.

use std::sync::Arc;

use apollo_compiler::Schema;
use apollo_compiler::validation::Valid;
use async_trait::async_trait;
use serde_json_bytes::Value;

use crate::error::FederationError;
use crate::error::FederationServiceError;
use crate::error::ServiceErrorKind;
use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::shape;
use crate::representation::RepresentationQueryBuilder;
use crate::representation::RepresentationRequest;
use crate::representation::WithWarnings;
use crate::resolver::EntityResolver;
use crate::resolver::ResolveContext;
use crate::subgraph::SubgraphDescriptor;
use crate::subgraph::spec::ENTITIES_QUERY;
use crate::subgraph::spec::ENTITY_UNION_NAME;
use crate::subgraph::spec::ID_FIELD_NAME;

/// Sends representation queries to one subgraph and remaps the entity it returns.
pub struct SubgraphEntityFetcher {
    descriptor: SubgraphDescriptor,
    schema: Arc<Valid<Schema>>,
}

impl SubgraphEntityFetcher {
    pub fn new(descriptor: SubgraphDescriptor, schema: Arc<Valid<Schema>>) -> Self {
        Self { descriptor, schema }
    }

    /// Sends `request` and returns the selected fields of the single entity in the response.
    pub async fn fetch(&self, request: &RepresentationRequest) -> Result<Object, FederationError> {
        tracing::debug!(
            subgraph = %self.descriptor.name,
            query = %request.query,
            "sending representation query"
        );
        let response = self
            .descriptor
            .client
            .request(request.to_graphql_request())
            .await
            .map_err(|error| self.error(ServiceErrorKind::Transport(error.to_string())))?;

        let entity = single_entity(response).map_err(|kind| self.error(kind))?;
        self.remap(request, &entity)
    }

    fn remap(
        &self,
        request: &RepresentationRequest,
        entity: &Value,
    ) -> Result<Object, FederationError> {
        let fields = match entity {
            Value::Object(fields) => Some(fields),
            Value::Null => None,
            Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
                return Err(self
                    .error(ServiceErrorKind::MalformedEntity(shape(entity)))
                    .into());
            }
        };

        let mut remapped = Object::new();
        for field_name in &request.selected_fields {
            let value = fields
                .and_then(|fields| fields.get(field_name.as_str()))
                .unwrap_or(&Value::Null);
            let value = self.map_field(request, field_name, value)?;
            remapped.insert(field_name.as_str(), value);
        }
        Ok(remapped)
    }

    fn map_field(
        &self,
        request: &RepresentationRequest,
        field_name: &str,
        value: &Value,
    ) -> Result<Value, FederationError> {
        match value {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(value.clone()),
            Value::Array(_) | Value::Object(_) => {
                if self.returns_entity(&request.entity_type, field_name) {
                    Err(FederationError::UnsupportedValue {
                        entity_type: request.entity_type.to_string(),
                        field: field_name.to_string(),
                        shape: shape(value),
                    })
                } else {
                    Ok(value.clone())
                }
            }
        }
    }

    /// Whether `type_name.field_name` returns one of this subgraph's entities.
    fn returns_entity(&self, type_name: &str, field_name: &str) -> bool {
        let Ok(field) = self.schema.type_field(type_name, field_name) else {
            return false;
        };
        let returned = field.ty.inner_named_type();
        self.schema
            .get_union(&ENTITY_UNION_NAME)
            .is_some_and(|entities| {
                entities
                    .members
                    .iter()
                    .any(|member| member.name.as_str() == returned.as_str())
            })
    }

    fn error(&self, kind: ServiceErrorKind) -> FederationServiceError {
        FederationServiceError {
            service: self.descriptor.name.clone(),
            url: self.descriptor.url.to_string(),
            kind,
        }
    }
}

#[async_trait]
impl EntityResolver for SubgraphEntityFetcher {
    async fn resolve(&self, context: &ResolveContext) -> Result<Object, FederationError> {
        let id = context
            .selection
            .arguments
            .get(ID_FIELD_NAME)
            .cloned()
            .unwrap_or(Value::Null);

        let WithWarnings {
            value: request,
            warnings,
        } = RepresentationQueryBuilder::new(&self.schema).build(
            &context.field_type,
            &id,
            &context.selection,
        );
        if !warnings.is_empty() {
            tracing::debug!(
                subgraph = %self.descriptor.name,
                count = warnings.len(),
                "representation query built with warnings"
            );
        }

        let Some(request) = request else {
            // nothing but the identifier is asked of this subgraph
            let mut short_circuit = Object::new();
            if context.selection.selects(ID_FIELD_NAME) {
                short_circuit.insert(ID_FIELD_NAME, id);
            }
            return Ok(short_circuit);
        };
        if id.is_null() {
            return Err(self
                .error(ServiceErrorKind::MissingIdentifier(
                    context.field_type.to_string(),
                ))
                .into());
        }
        self.fetch(&request).await
    }
}

/// Validates an `_entities` response envelope and extracts its only element.
fn single_entity(response: Option<graphql::Response>) -> Result<Value, ServiceErrorKind> {
    let response = response.ok_or(ServiceErrorKind::NullResponse)?;
    if response.has_errors() {
        return Err(ServiceErrorKind::Errors(response.error_messages()));
    }
    let mut data = response.data.ok_or(ServiceErrorKind::NoData)?;
    let entities = data
        .as_object_mut()
        .and_then(|data| data.remove(ENTITIES_QUERY.as_str()));
    let entities = match entities {
        Some(Value::Array(entities)) => entities,
        _ => return Err(ServiceErrorKind::NoEntities),
    };
    let mut entities = entities.into_iter();
    match (entities.next(), entities.len()) {
        (None, _) => Err(ServiceErrorKind::EmptyEntities),
        (Some(entity), 0) => Ok(entity),
        (Some(_), rest) => Err(ServiceErrorKind::MultipleEntities(rest + 1)),
    }
}
