//! Merging of subgraph schemas into the schema served to clients.
//!
//! The merge walks every subgraph depth first (types, then fields, then arguments; enums, then
//! values) through a single [`SchemaNode`] visitor. The first subgraph declaring a type or field
//! decides its shape; later subgraphs only add what is missing. Federated root fields declared
//! by several subgraphs end up bound to one composite resolver calling all of them.

use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast::FieldDefinition;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::EnumType;
use apollo_compiler::schema::EnumValueDefinition;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InputObjectType;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::Name;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::schema::ScalarType;
use apollo_compiler::schema::UnionType;
use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::FederationError;
use crate::resolver::FieldCoordinate;
use crate::resolver::Resolver;
use crate::subgraph::SubgraphSchema;
use crate::subgraph::spec::QUERY_TYPE_NAME;
use crate::subgraph::spec::is_federation_name;

/// The unified schema and the resolver bound to every federated field.
#[derive(Clone, Debug)]
pub struct MergedSchema {
    schema: Schema,
    resolvers: IndexMap<FieldCoordinate, Resolver>,
}

impl MergedSchema {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn resolver(&self, coordinate: &FieldCoordinate) -> Option<&Resolver> {
        self.resolvers.get(coordinate)
    }

    pub fn resolvers(&self) -> impl Iterator<Item = (&FieldCoordinate, &Resolver)> {
        self.resolvers.iter()
    }

    /// The merged schema printed as SDL.
    pub fn sdl(&self) -> String {
        self.schema.to_string()
    }
}

/// Merges subgraph schemas, in order.
pub fn merge_subgraphs(subgraphs: &[SubgraphSchema]) -> Result<MergedSchema, FederationError> {
    let mut merger = SchemaMerger::new();
    for subgraph in subgraphs {
        merger.merge(subgraph);
    }
    merger.finish()
}

/// A node of the subgraph schema walk.
enum SchemaNode<'a> {
    Object(&'a Node<ObjectType>),
    Field(&'a Component<FieldDefinition>),
    Argument(&'a Node<InputValueDefinition>),
    Enum(&'a Node<EnumType>),
    EnumValue(&'a Component<EnumValueDefinition>),
    /// Scalars, input objects, interfaces and unions: merged without descending.
    Other(&'a ExtendedType),
}

/// Where the walk currently is.
struct MergeCursor<'a> {
    subgraph: &'a SubgraphSchema,
    object: Option<Name>,
    field: Option<FieldCoordinate>,
    /// Whether the current field was first declared by this subgraph; only then are its
    /// arguments copied.
    fresh_field: bool,
    enum_type: Option<Name>,
}

impl<'a> MergeCursor<'a> {
    fn new(subgraph: &'a SubgraphSchema) -> Self {
        Self {
            subgraph,
            object: None,
            field: None,
            fresh_field: false,
            enum_type: None,
        }
    }
}

pub struct SchemaMerger {
    schema: Schema,
    resolvers: IndexMap<FieldCoordinate, Resolver>,
}

impl Default for SchemaMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaMerger {
    pub fn new() -> Self {
        Self {
            schema: Schema::new(),
            resolvers: IndexMap::new(),
        }
    }

    pub fn merge(&mut self, subgraph: &SubgraphSchema) {
        let mut cursor = MergeCursor::new(subgraph);
        for (name, ty) in &subgraph.schema().types {
            if ty.is_built_in() || is_federation_name(name) {
                // skip built-ins and federation specific types
                continue;
            }
            let node = match ty {
                ExtendedType::Object(object) => SchemaNode::Object(object),
                ExtendedType::Enum(enum_type) => SchemaNode::Enum(enum_type),
                other => SchemaNode::Other(other),
            };
            self.visit(node, &mut cursor);
        }
    }

    fn visit(&mut self, node: SchemaNode<'_>, cursor: &mut MergeCursor<'_>) {
        match node {
            SchemaNode::Object(object) => {
                self.schema
                    .types
                    .entry(object.name.clone())
                    .or_insert_with(|| copy_object_type_stub(object));
                cursor.object = Some(object.name.clone());
                for field in object.fields.values() {
                    self.visit(SchemaNode::Field(field), cursor);
                }
                cursor.object = None;
            }
            SchemaNode::Field(field) => {
                let Some(object_name) = cursor.object.clone() else {
                    return;
                };
                if is_federation_name(&field.name) {
                    return;
                }
                let coordinate = FieldCoordinate::new(object_name, field.name.clone());
                cursor.fresh_field = self.add_field(&coordinate, field);
                self.bind_resolver(cursor.subgraph, &coordinate);

                cursor.field = Some(coordinate);
                for argument in &field.arguments {
                    self.visit(SchemaNode::Argument(argument), cursor);
                }
                cursor.field = None;
                cursor.fresh_field = false;
            }
            SchemaNode::Argument(argument) => {
                let Some(coordinate) = &cursor.field else {
                    return;
                };
                if !cursor.fresh_field {
                    return;
                }
                if let Some(ExtendedType::Object(object)) =
                    self.schema.types.get_mut(&coordinate.type_name)
                {
                    if let Some(field) = object.make_mut().fields.get_mut(&coordinate.field_name) {
                        field.make_mut().arguments.push(copy_argument(argument));
                    }
                }
            }
            SchemaNode::Enum(enum_type) => {
                self.schema
                    .types
                    .entry(enum_type.name.clone())
                    .or_insert_with(|| copy_enum_type(enum_type));
                cursor.enum_type = Some(enum_type.name.clone());
                for value in enum_type.values.values() {
                    self.visit(SchemaNode::EnumValue(value), cursor);
                }
                cursor.enum_type = None;
            }
            SchemaNode::EnumValue(value) => {
                let Some(enum_name) = &cursor.enum_type else {
                    return;
                };
                if let Some(ExtendedType::Enum(merged)) = self.schema.types.get_mut(enum_name) {
                    merged
                        .make_mut()
                        .values
                        .entry(value.value.clone())
                        .or_insert_with(|| {
                            Component::new(EnumValueDefinition {
                                description: value.description.clone(),
                                value: value.value.clone(),
                                directives: Default::default(),
                            })
                        });
                }
            }
            SchemaNode::Other(ty) => self.merge_other(ty),
        }
    }

    /// Registers the field on the merged object type unless it is already there.
    ///
    /// Returns whether the field is new.
    fn add_field(&mut self, coordinate: &FieldCoordinate, field: &FieldDefinition) -> bool {
        let Some(ExtendedType::Object(object)) = self.schema.types.get_mut(&coordinate.type_name)
        else {
            return false;
        };
        if object.fields.contains_key(&coordinate.field_name) {
            return false;
        }
        // output types stay named references, resolved against the merged schema as a whole
        object.make_mut().fields.insert(
            coordinate.field_name.clone(),
            Component::new(FieldDefinition {
                description: field.description.clone(),
                name: field.name.clone(),
                arguments: Vec::new(),
                ty: field.ty.clone(),
                directives: Default::default(),
            }),
        );
        true
    }

    fn bind_resolver(&mut self, subgraph: &SubgraphSchema, coordinate: &FieldCoordinate) {
        let Some(resolver) = subgraph.resolver(coordinate) else {
            return;
        };
        match self.resolvers.entry(coordinate.clone()) {
            Entry::Occupied(mut entry) => {
                let combined = entry.get().clone().combine(resolver.clone());
                tracing::debug!(
                    %coordinate,
                    subgraphs = ?combined.subgraphs(),
                    "composing federated resolvers"
                );
                *entry.get_mut() = combined;
            }
            Entry::Vacant(entry) => {
                entry.insert(resolver.clone());
            }
        }
    }

    fn merge_other(&mut self, ty: &ExtendedType) {
        let merged = self
            .schema
            .types
            .entry(ty.name().clone())
            .or_insert_with(|| copy_type_stub(ty));
        match (merged, ty) {
            (ExtendedType::InputObject(merged), ExtendedType::InputObject(input)) => {
                for (name, field) in &input.fields {
                    merged
                        .make_mut()
                        .fields
                        .entry(name.clone())
                        .or_insert_with(|| field.clone());
                }
            }
            (ExtendedType::Interface(merged), ExtendedType::Interface(interface)) => {
                for (name, field) in &interface.fields {
                    if is_federation_name(name) {
                        continue;
                    }
                    merged
                        .make_mut()
                        .fields
                        .entry(name.clone())
                        .or_insert_with(|| copy_field(field));
                }
            }
            (ExtendedType::Union(merged), ExtendedType::Union(union)) => {
                merged.make_mut().members.extend(union.members.iter().cloned());
            }
            _ => {}
        }
    }

    /// Sets `Query` as the root and declares every referenced but undeclared type as a scalar.
    pub fn finish(mut self) -> Result<MergedSchema, FederationError> {
        if self.schema.get_object(&QUERY_TYPE_NAME).is_none() {
            return Err(FederationError::InvalidMergedSchema {
                message: "no subgraph declares a Query type".to_string(),
            });
        }
        self.schema.schema_definition.make_mut().query = Some(ComponentName::from(QUERY_TYPE_NAME));

        for name in self.undeclared_types() {
            tracing::debug!(scalar = %name, "declaring referenced type as scalar");
            self.schema.types.insert(
                name.clone(),
                ExtendedType::Scalar(Node::new(ScalarType {
                    description: None,
                    name,
                    directives: Default::default(),
                })),
            );
        }

        Ok(MergedSchema {
            schema: self.schema,
            resolvers: self.resolvers,
        })
    }

    fn undeclared_types(&self) -> IndexSet<Name> {
        let mut referenced = IndexSet::default();
        for ty in self.schema.types.values() {
            let fields = match ty {
                ExtendedType::Object(object) => &object.fields,
                ExtendedType::Interface(interface) => &interface.fields,
                ExtendedType::InputObject(input) => {
                    referenced.extend(
                        input
                            .fields
                            .values()
                            .map(|field| field.ty.inner_named_type().clone()),
                    );
                    continue;
                }
                _ => continue,
            };
            for field in fields.values() {
                referenced.insert(field.ty.inner_named_type().clone());
                referenced.extend(
                    field
                        .arguments
                        .iter()
                        .map(|argument| argument.ty.inner_named_type().clone()),
                );
            }
        }
        referenced.retain(|name| !self.schema.types.contains_key(name));
        referenced
    }
}

fn copy_object_type_stub(object: &Node<ObjectType>) -> ExtendedType {
    ExtendedType::Object(Node::new(ObjectType {
        description: object.description.clone(),
        name: object.name.clone(),
        implements_interfaces: object.implements_interfaces.clone(),
        directives: Default::default(),
        fields: Default::default(),
    }))
}

fn copy_enum_type(enum_type: &Node<EnumType>) -> ExtendedType {
    ExtendedType::Enum(Node::new(EnumType {
        description: enum_type.description.clone(),
        name: enum_type.name.clone(),
        directives: Default::default(),
        values: Default::default(),
    }))
}

fn copy_type_stub(ty: &ExtendedType) -> ExtendedType {
    match ty {
        ExtendedType::Scalar(scalar) => ExtendedType::Scalar(Node::new(ScalarType {
            description: scalar.description.clone(),
            name: scalar.name.clone(),
            directives: Default::default(),
        })),
        ExtendedType::InputObject(input) => ExtendedType::InputObject(Node::new(InputObjectType {
            description: input.description.clone(),
            name: input.name.clone(),
            directives: Default::default(),
            fields: Default::default(),
        })),
        ExtendedType::Interface(interface) => ExtendedType::Interface(Node::new(InterfaceType {
            description: interface.description.clone(),
            name: interface.name.clone(),
            implements_interfaces: interface.implements_interfaces.clone(),
            directives: Default::default(),
            fields: Default::default(),
        })),
        ExtendedType::Union(union) => ExtendedType::Union(Node::new(UnionType {
            description: union.description.clone(),
            name: union.name.clone(),
            directives: Default::default(),
            members: Default::default(),
        })),
        ExtendedType::Object(object) => copy_object_type_stub(object),
        ExtendedType::Enum(enum_type) => copy_enum_type(enum_type),
    }
}

fn copy_field(field: &Component<FieldDefinition>) -> Component<FieldDefinition> {
    Component::new(FieldDefinition {
        description: field.description.clone(),
        name: field.name.clone(),
        arguments: field.arguments.iter().map(copy_argument).collect(),
        ty: field.ty.clone(),
        directives: Default::default(),
    })
}

fn copy_argument(argument: &Node<InputValueDefinition>) -> Node<InputValueDefinition> {
    Node::new(InputValueDefinition {
        description: argument.description.clone(),
        name: argument.name.clone(),
        ty: argument.ty.clone(),
        default_value: argument.default_value.clone(),
        directives: Default::default(),
    })
}
