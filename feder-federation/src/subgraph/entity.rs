use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::ObjectType;

use crate::error::CoercionError;
use crate::field_set::coerce_fields_argument;
use crate::subgraph::spec::EXTENDS_DIRECTIVE_NAME;
use crate::subgraph::spec::ID_FIELD_NAME;
use crate::subgraph::spec::ID_SCALAR_NAME;
use crate::subgraph::spec::KEY_DIRECTIVE_NAME;
use crate::subgraph::spec::ROOT_TYPE_NAMES;
use crate::subgraph::spec::is_federation_name;

/// Decides which object types of a subgraph are entities.
pub struct EntityClassifier;

impl EntityClassifier {
    /// An object type is an entity when it carries `@key` or `@extends`, or, failing that, when
    /// it is not a root operation type and has a field whose named type is `ID`.
    pub fn is_entity(object: &ObjectType) -> bool {
        if object.directives.has(&KEY_DIRECTIVE_NAME)
            || object.directives.has(&EXTENDS_DIRECTIVE_NAME)
        {
            return true;
        }
        !ROOT_TYPE_NAMES.contains(&object.name.as_str())
            && object
                .fields
                .values()
                .any(|field| *field.ty.inner_named_type() == ID_SCALAR_NAME)
    }

    /// The entity types of `schema`, in declaration order.
    ///
    /// Keys naming anything other than `id` are reported and still resolved by `id`.
    pub fn entities(subgraph: &str, schema: &Schema) -> Result<IndexSet<Name>, CoercionError> {
        let mut entities = IndexSet::default();
        for ty in schema.types.values() {
            let ExtendedType::Object(object) = ty else {
                continue;
            };
            if ty.is_built_in() || is_federation_name(&object.name) || !Self::is_entity(object) {
                continue;
            }
            for key in object.directives.get_all(&KEY_DIRECTIVE_NAME) {
                if let Some(field_set) = coerce_fields_argument(key)? {
                    if !field_set.is_single(ID_FIELD_NAME) {
                        tracing::warn!(
                            subgraph,
                            entity = %object.name,
                            key = ?field_set.selections(),
                            "only `id` keys are supported, entity will be resolved by `id`"
                        );
                    }
                }
            }
            entities.insert(object.name.clone());
        }
        Ok(entities)
    }
}
