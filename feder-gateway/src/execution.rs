//! The executable schema served to clients.
//!
//! Every merged type is registered with the engine. Fields bound to a federated resolver call
//! it with the client selection; every other field reads its value from the parent object
//! returned by that resolver.

use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::ast::FieldDefinition;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::EnumType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InputObjectType;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::schema::ScalarType;
use apollo_compiler::schema::UnionType;
use async_graphql::ErrorExtensions;
use async_graphql::SelectionField;
use async_graphql::Value as ConstValue;
use async_graphql::Variables;
use async_graphql::dynamic;
use async_graphql::dynamic::Field;
use async_graphql::dynamic::FieldFuture;
use async_graphql::dynamic::FieldValue;
use async_graphql::dynamic::TypeRef;
use feder_federation::FederationError;
use feder_federation::MergedSchema;
use feder_federation::Resolver;
use feder_federation::SelectionNode;
use feder_federation::graphql;
use feder_federation::resolver::FieldCoordinate;
use feder_federation::resolver::ResolveContext;
use feder_federation::subgraph::spec::QUERY_TYPE_NAME;
use feder_federation::subgraph::spec::TYPENAME_FIELD_NAME;
use serde_json_bytes::Value;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::json_ext::from_const_value;
use crate::json_ext::literal_to_const_value;
use crate::json_ext::to_const_value;

/// The output types whose values need a hint before the engine can use them.
#[derive(Default)]
struct TypeHints {
    enums: IndexSet<Name>,
    abstract_types: IndexSet<Name>,
}

type Hints = Arc<TypeHints>;

/// Builds the engine schema for a merged schema.
pub(crate) fn executable_schema(merged: &MergedSchema) -> Result<dynamic::Schema, GatewayError> {
    let schema = merged.schema();
    let mut hints = TypeHints::default();
    for (name, ty) in &schema.types {
        match ty {
            ExtendedType::Enum(_) => {
                hints.enums.insert(name.clone());
            }
            ExtendedType::Interface(_) | ExtendedType::Union(_) => {
                hints.abstract_types.insert(name.clone());
            }
            _ => {}
        }
    }
    let hints: Hints = Arc::new(hints);

    let mut builder = dynamic::Schema::build(QUERY_TYPE_NAME.as_str(), None, None);
    for ty in schema.types.values() {
        if ty.is_built_in() {
            continue;
        }
        builder = match ty {
            ExtendedType::Object(object) => builder.register(object_type(merged, object, &hints)),
            ExtendedType::Interface(interface) => builder.register(interface_type(interface)),
            ExtendedType::Union(union) => builder.register(union_type(union)),
            ExtendedType::Enum(enum_type) => builder.register(enum_type_of(enum_type)),
            ExtendedType::InputObject(input) => builder.register(input_object_type(input)),
            // custom scalars accept any value
            ExtendedType::Scalar(scalar) => builder.register(scalar_type(scalar)),
        };
    }
    builder
        .finish()
        .map_err(|error| GatewayError::Engine(error.to_string()))
}

/// Runs a client operation against the engine schema.
pub(crate) async fn execute(
    schema: &dynamic::Schema,
    request: graphql::Request,
) -> graphql::Response {
    let graphql::Request {
        query,
        operation_name,
        variables,
    } = request;
    let mut engine_request = async_graphql::Request::new(query).variables(Variables::from_value(
        to_const_value(&Value::Object(variables)),
    ));
    if let Some(operation_name) = operation_name {
        engine_request = engine_request.operation_name(operation_name);
    }

    let response = schema.execute(engine_request).await;
    match serde_json::to_value(&response).and_then(serde_json::from_value) {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(%error, "could not serialize the engine response");
            graphql::Response::from_errors(vec![graphql::Error::new(
                "could not serialize the response",
            )])
        }
    }
}

fn object_type(merged: &MergedSchema, object: &ObjectType, hints: &Hints) -> dynamic::Object {
    let mut engine_object = dynamic::Object::new(object.name.as_str());
    if let Some(description) = &object.description {
        engine_object = engine_object.description(description.to_string());
    }
    for interface in &object.implements_interfaces {
        engine_object = engine_object.implement(interface.name.as_str());
    }
    for (field_name, field) in &object.fields {
        let coordinate = FieldCoordinate::new(object.name.clone(), field_name.clone());
        let mut engine_field = match merged.resolver(&coordinate) {
            Some(resolver) => federated_field(field, resolver.clone(), hints.clone()),
            None => property_field(field, hints.clone()),
        };
        if let Some(description) = &field.description {
            engine_field = engine_field.description(description.to_string());
        }
        for argument in &field.arguments {
            engine_field = engine_field.argument(input_value(argument));
        }
        engine_object = engine_object.field(engine_field);
    }
    engine_object
}

fn interface_type(interface: &InterfaceType) -> dynamic::Interface {
    let mut engine_interface = dynamic::Interface::new(interface.name.as_str());
    for parent in &interface.implements_interfaces {
        engine_interface = engine_interface.implement(parent.name.as_str());
    }
    for (field_name, field) in &interface.fields {
        let field_type = type_ref(&field.ty);
        let mut engine_field = dynamic::InterfaceField::new(field_name.as_str(), field_type);
        for argument in &field.arguments {
            engine_field = engine_field.argument(input_value(argument));
        }
        engine_interface = engine_interface.field(engine_field);
    }
    engine_interface
}

fn union_type(union: &UnionType) -> dynamic::Union {
    union
        .members
        .iter()
        .fold(dynamic::Union::new(union.name.as_str()), |engine_union, member| {
            engine_union.possible_type(member.name.as_str())
        })
}

fn enum_type_of(enum_type: &EnumType) -> dynamic::Enum {
    enum_type
        .values
        .keys()
        .fold(dynamic::Enum::new(enum_type.name.as_str()), |engine_enum, value| {
            engine_enum.item(dynamic::EnumItem::new(value.as_str()))
        })
}

fn input_object_type(input: &InputObjectType) -> dynamic::InputObject {
    input
        .fields
        .values()
        .fold(dynamic::InputObject::new(input.name.as_str()), |engine_input, field| {
            engine_input.field(input_value(field))
        })
}

fn input_value(argument: &InputValueDefinition) -> dynamic::InputValue {
    let engine_value = dynamic::InputValue::new(argument.name.as_str(), type_ref(&argument.ty));
    let default_value = argument.default_value.as_deref();
    match default_value.and_then(literal_to_const_value) {
        Some(default_value) => engine_value.default_value(default_value),
        None => engine_value,
    }
}

fn scalar_type(scalar: &ScalarType) -> dynamic::Scalar {
    dynamic::Scalar::new(scalar.name.as_str())
}

fn type_ref(ty: &ast::Type) -> TypeRef {
    match ty {
        ast::Type::Named(name) => TypeRef::named(name.as_str()),
        ast::Type::NonNullNamed(name) => TypeRef::named_nn(name.as_str()),
        ast::Type::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
        ast::Type::NonNullList(inner) => {
            TypeRef::NonNull(Box::new(TypeRef::List(Box::new(type_ref(inner)))))
        }
    }
}

/// A field answered by the federated resolver bound to it.
fn federated_field(field: &FieldDefinition, resolver: Resolver, hints: Hints) -> Field {
    let resolver = Arc::new(resolver);
    let ty = field.ty.clone();
    let coordinate = field.name.clone();
    Field::new(field.name.as_str(), type_ref(&field.ty), move |ctx| {
        let resolver = resolver.clone();
        let hints = hints.clone();
        let ty = ty.clone();
        let coordinate = coordinate.clone();
        FieldFuture::new(async move {
            if ty.is_list() {
                return Err(async_graphql::Error::new(format!(
                    "field '{coordinate}' returns a list and cannot be resolved by representation"
                )));
            }
            let context = ResolveContext {
                field_type: ty.inner_named_type().clone(),
                selection: selection_node(ctx.field())?,
            };
            let object = resolver.resolve(&context).await.map_err(error_boundary)?;
            Ok(field_value(to_const_value(&Value::Object(object)), &ty, &hints))
        })
    })
}

/// A field read from the parent value.
fn property_field(field: &FieldDefinition, hints: Hints) -> Field {
    let ty = field.ty.clone();
    let name = field.name.clone();
    Field::new(field.name.as_str(), type_ref(&field.ty), move |ctx| {
        let value = match ctx.parent_value.as_value() {
            Some(ConstValue::Object(parent)) => parent.get(name.as_str()).cloned(),
            _ => None,
        };
        let value = value.and_then(|value| field_value(value, &ty, &hints));
        FieldFuture::new(async move { Ok(value) })
    })
}

/// Wraps an engine value so the engine can descend into it.
///
/// Strings delivered for enum types become enum values, and objects of interface or union types
/// are tagged with the concrete type named by their `__typename`.
fn field_value<'a>(value: ConstValue, ty: &ast::Type, hints: &Hints) -> Option<FieldValue<'a>> {
    match value {
        ConstValue::Null => None,
        ConstValue::List(items) => Some(FieldValue::list(items.into_iter().map(|item| {
            field_value(item, ty.item_type(), hints).unwrap_or(FieldValue::NULL)
        }))),
        ConstValue::String(string) if hints.enums.contains(ty.inner_named_type()) => {
            let value = ConstValue::Enum(async_graphql::Name::new(string));
            Some(FieldValue::value(value))
        }
        ConstValue::Object(object) if hints.abstract_types.contains(ty.inner_named_type()) => {
            let typename = match object.get(TYPENAME_FIELD_NAME) {
                Some(ConstValue::String(typename)) => Some(typename.clone()),
                _ => None,
            };
            let value = FieldValue::value(ConstValue::Object(object));
            Some(match typename {
                Some(typename) => value.with_type(typename),
                None => value,
            })
        }
        other => Some(FieldValue::value(other)),
    }
}

fn selection_node(field: SelectionField<'_>) -> Result<SelectionNode, async_graphql::Error> {
    let mut node = SelectionNode::new(field.name());
    let arguments = field
        .arguments()
        .map_err(|error| async_graphql::Error::new(error.message))?;
    for (name, value) in arguments {
        node = node.with_argument(name.as_str(), from_const_value(&value));
    }
    for child in field.selection_set() {
        node = node.with_selection(selection_node(child)?);
    }
    Ok(node)
}

/// Logs a failed federated resolution in full and hands the client the message and an
/// `instance` id to correlate with the logs.
fn error_boundary(error: FederationError) -> async_graphql::Error {
    let instance = Uuid::new_v4().to_string();
    tracing::error!(
        %instance,
        service = error.service().unwrap_or_default(),
        error = ?error,
        "could not resolve federated field"
    );
    async_graphql::Error::new(error.to_string())
        .extend_with(|_, extensions| extensions.set("instance", instance))
}
