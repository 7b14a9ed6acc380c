//! Compilation of `_entities` representation queries.
//!
//! Given an entity type, the value of its `id` and the client's selection on it, the
//! [`RepresentationQueryBuilder`] emits the smallest query one subgraph needs to answer:
//!
//! ```graphql
//! query($representations:[_Any!]! $locale:String){_entities(representations:$representations){...on Product{__typename name price{__typename tag(locale:$locale) } }}}
//! ```
//!
//! The output is deterministic: the same selection always compiles to the same bytes.

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::FieldDefinition;
use displaydoc::Display;
use indexmap::IndexMap;
use serde_json_bytes::Value;
use serde_json_bytes::json;

use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::id_string;
use crate::selection::SelectionNode;
use crate::subgraph::spec::ENTITIES_QUERY;
use crate::subgraph::spec::ID_FIELD_NAME;
use crate::subgraph::spec::REPRESENTATIONS_ARGUMENT_NAME;
use crate::subgraph::spec::REPRESENTATIONS_VARIABLE_TYPE;
use crate::subgraph::spec::TYPENAME_FIELD_NAME;

/// A value together with the recoverable problems met while producing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithWarnings<T> {
    pub value: T,
    pub warnings: Vec<BuildWarning>,
}

impl<T> WithWarnings<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }
}

/// Non-fatal problems of a representation query.
#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// duplicate variable ${name} in the representation query for {entity_type} was dropped
    DuplicateVariable { entity_type: String, name: String },
    /// argument '{argument}' of field '{field}' has no declared type and was dropped
    UndeclaredArgument { field: String, argument: String },
}

/// A declared variable of a representation query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub declared_type: String,
    pub value: Value,
}

/// A compiled `_entities` query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepresentationRequest {
    pub entity_type: Name,
    pub query: String,
    /// Variables in declaration order, `representations` first.
    pub variables: IndexMap<String, Variable>,
    /// The top-level fields asked of the subgraph, sorted by name.
    pub selected_fields: Vec<String>,
}

impl RepresentationRequest {
    pub fn to_graphql_request(&self) -> graphql::Request {
        let variables: Object = self
            .variables
            .iter()
            .map(|(name, variable)| (name.as_str().into(), variable.value.clone()))
            .collect();
        graphql::Request::new(self.query.clone()).with_variables(variables)
    }
}

/// Builds representation queries against one subgraph schema.
pub struct RepresentationQueryBuilder<'a> {
    schema: &'a Schema,
}

impl<'a> RepresentationQueryBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Compiles the query resolving `selection` on the `entity_type` identified by `id`.
    ///
    /// Returns no request when the subgraph contributes nothing but the identifier: either none
    /// of the selected fields are declared by the subgraph, or only `id` is.
    pub fn build(
        &self,
        entity_type: &Name,
        id: &Value,
        selection: &SelectionNode,
    ) -> WithWarnings<Option<RepresentationRequest>> {
        let mut fields: Vec<&SelectionNode> = Vec::new();
        for child in &selection.sub_selections {
            // the fragment always carries `__typename`, it is never a reason to fetch
            if child.field_name == TYPENAME_FIELD_NAME
                || self.field_definition(entity_type, &child.field_name).is_none()
            {
                continue;
            }
            if fields.iter().any(|kept| kept.field_name == child.field_name) {
                continue;
            }
            fields.push(child);
        }
        fields.sort_by(|a, b| a.field_name.cmp(&b.field_name));

        match fields.as_slice() {
            [] => return WithWarnings::new(None),
            [only] if only.field_name == ID_FIELD_NAME => return WithWarnings::new(None),
            _ => {}
        }

        let mut writer = QueryWriter::new(self, entity_type);
        writer.declare(
            REPRESENTATIONS_ARGUMENT_NAME.as_str(),
            REPRESENTATIONS_VARIABLE_TYPE.to_string(),
            json!({
                "__typename": entity_type.as_str(),
                "id": id_string(id),
            }),
        );
        writer.fragment(Some(entity_type), fields.iter().copied());

        let selected_fields = fields.iter().map(|f| f.field_name.clone()).collect();
        let QueryWriter {
            body,
            variables,
            warnings,
            ..
        } = writer;

        let mut query = String::from("query(");
        for (position, (name, variable)) in variables.iter().enumerate() {
            if position > 0 {
                query.push(' ');
            }
            query.push_str(&format!("${name}:{}", variable.declared_type));
        }
        query.push_str(&format!(
            "){{{ENTITIES_QUERY}({REPRESENTATIONS_ARGUMENT_NAME}:${REPRESENTATIONS_ARGUMENT_NAME}){{...on {entity_type}{body}}}}}"
        ));

        WithWarnings {
            value: Some(RepresentationRequest {
                entity_type: entity_type.clone(),
                query,
                variables,
                selected_fields,
            }),
            warnings,
        }
    }

    fn field_definition(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Option<&'a Component<FieldDefinition>> {
        self.schema.type_field(type_name, field_name).ok()
    }
}

struct QueryWriter<'b, 'a> {
    builder: &'b RepresentationQueryBuilder<'a>,
    entity_type: &'b Name,
    body: String,
    variables: IndexMap<String, Variable>,
    warnings: Vec<BuildWarning>,
}

impl<'b, 'a> QueryWriter<'b, 'a> {
    fn new(builder: &'b RepresentationQueryBuilder<'a>, entity_type: &'b Name) -> Self {
        Self {
            builder,
            entity_type,
            body: String::new(),
            variables: IndexMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Declares a variable unless the name is taken, in which case the later binding is dropped.
    fn declare(&mut self, name: &str, declared_type: String, value: Value) {
        if self.variables.contains_key(name) {
            let warning = BuildWarning::DuplicateVariable {
                entity_type: self.entity_type.to_string(),
                name: name.to_string(),
            };
            tracing::warn!("{warning}");
            self.warnings.push(warning);
            return;
        }
        self.variables.insert(
            name.to_string(),
            Variable {
                declared_type,
                value,
            },
        );
    }

    /// Writes `{__typename f1 f2 }` for the selections on `parent_type`.
    fn fragment<'s>(
        &mut self,
        parent_type: Option<&Name>,
        selections: impl Iterator<Item = &'s SelectionNode>,
    ) {
        let selections: Vec<&SelectionNode> = selections.collect();
        self.body.push('{');
        if !selections.iter().any(|s| s.field_name == TYPENAME_FIELD_NAME) {
            self.body.push_str(TYPENAME_FIELD_NAME);
            self.body.push(' ');
        }
        for selection in selections {
            self.field(parent_type, selection);
        }
        self.body.push('}');
    }

    fn field(&mut self, parent_type: Option<&Name>, selection: &SelectionNode) {
        let definition =
            parent_type.and_then(|ty| self.builder.field_definition(ty, &selection.field_name));
        self.body.push_str(&selection.field_name);

        let mut arguments = Vec::new();
        for (argument, value) in &selection.arguments {
            let declared = definition.and_then(|def| def.argument_by_name(argument));
            let Some(declared) = declared else {
                let warning = BuildWarning::UndeclaredArgument {
                    field: selection.field_name.clone(),
                    argument: argument.clone(),
                };
                tracing::warn!("{warning}");
                self.warnings.push(warning);
                continue;
            };
            self.declare(argument, declared.ty.to_string(), value.clone());
            arguments.push(format!("{argument}:${argument}"));
        }
        if !arguments.is_empty() {
            self.body.push_str(&format!("({})", arguments.join(",")));
        }

        if !selection.sub_selections.is_empty() {
            let nested_type = definition.map(|def| def.ty.inner_named_type().clone());
            self.fragment(nested_type.as_ref(), selection.sub_selections.iter());
        }
        self.body.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::test_support::PRICES_SDL;
    use crate::test_support::PRODUCTS_SDL;
    use crate::test_support::StubClient;
    use crate::test_support::subgraph;

    fn product() -> Name {
        Name::new("Product").unwrap()
    }

    fn build(sdl: &str, selection: &SelectionNode) -> WithWarnings<Option<RepresentationRequest>> {
        let subgraph = subgraph("test", sdl, StubClient::default());
        RepresentationQueryBuilder::new(subgraph.schema()).build(&product(), &json!("1"), selection)
    }

    #[test]
    fn compiles_sorted_fields_with_typename() {
        let selection = SelectionNode::new("product").with_fields(["name", "description"]);

        let WithWarnings { value, warnings } = build(PRODUCTS_SDL, &selection);
        let request = value.unwrap();

        assert!(warnings.is_empty());
        assert_eq!(
            request.query,
            "query($representations:[_Any!]!){_entities(representations:$representations){...on Product{__typename description name }}}"
        );
        assert_eq!(request.selected_fields, ["description", "name"]);
        assert_eq!(
            serde_json::to_value(request.to_graphql_request().variables).unwrap(),
            serde_json::json!({"representations": {"__typename": "Product", "id": "1"}})
        );
    }

    #[test]
    fn nested_selection_with_arguments() {
        let selection = SelectionNode::new("product")
            .with_fields(["id"])
            .with_selection(
                SelectionNode::new("price")
                    .with_selection(SelectionNode::new("tag").with_argument("locale", json!("es"))),
            );

        let request = build(PRICES_SDL, &selection).value.unwrap();

        assert_snapshot!(request.query, @"query($representations:[_Any!]! $locale:String){_entities(representations:$representations){...on Product{__typename id price{__typename tag(locale:$locale) } }}}");
        let locale = request.variables.get("locale").unwrap();
        assert_eq!(locale.declared_type, "String");
        assert_eq!(locale.value, json!("es"));
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let selection = SelectionNode::new("product").with_fields(["name", "price"]);
        let request = build(PRODUCTS_SDL, &selection).value.unwrap();
        assert_eq!(request.selected_fields, ["name"]);
    }

    #[test]
    fn id_only_or_nothing_compiles_to_none() {
        let only_id = SelectionNode::new("product").with_fields(["id"]);
        assert_eq!(build(PRODUCTS_SDL, &only_id).value, None);

        let foreign = SelectionNode::new("product").with_fields(["price"]);
        assert_eq!(build(PRODUCTS_SDL, &foreign).value, None);

        let id_and_foreign = SelectionNode::new("product").with_fields(["id", "price"]);
        assert_eq!(build(PRODUCTS_SDL, &id_and_foreign).value, None);
    }

    #[test]
    fn typename_alone_does_not_need_a_fetch() {
        let typename_and_id = SelectionNode::new("product").with_fields(["__typename", "id"]);
        assert_eq!(build(PRODUCTS_SDL, &typename_and_id).value, None);

        let typename = SelectionNode::new("product").with_fields(["__typename"]);
        assert_eq!(build(PRODUCTS_SDL, &typename).value, None);

        let with_name = SelectionNode::new("product").with_fields(["__typename", "name"]);
        let request = build(PRODUCTS_SDL, &with_name).value.unwrap();
        assert_eq!(request.selected_fields, ["name"]);
        assert_eq!(
            request.query,
            "query($representations:[_Any!]!){_entities(representations:$representations){...on Product{__typename name }}}"
        );
    }

    #[test]
    fn compilation_is_deterministic() {
        let selection = SelectionNode::new("product").with_fields(["name", "id", "description"]);
        let first = build(PRODUCTS_SDL, &selection).value.unwrap();
        let second = build(PRODUCTS_SDL, &selection).value.unwrap();
        assert_eq!(first.query, second.query);
        assert_eq!(first.variables, second.variables);
    }

    #[test]
    #[traced_test]
    fn duplicate_variables_are_dropped_with_a_warning() {
        let sdl = r#"
            type Query { product(id: ID!): Product }
            type Product @key(fields: "id") {
              id: ID!
              title(locale: String): String
              summary(locale: String): String
            }
        "#;
        let selection = SelectionNode::new("product")
            .with_selection(SelectionNode::new("title").with_argument("locale", json!("fr")))
            .with_selection(SelectionNode::new("summary").with_argument("locale", json!("de")));

        let WithWarnings { value, warnings } = build(sdl, &selection);
        let request = value.unwrap();

        assert_eq!(
            request.query,
            "query($representations:[_Any!]! $locale:String){_entities(representations:$representations){...on Product{__typename summary(locale:$locale) title(locale:$locale) }}}"
        );
        assert_eq!(request.variables.get("locale").unwrap().value, json!("de"));
        assert_eq!(
            warnings,
            [BuildWarning::DuplicateVariable {
                entity_type: "Product".to_string(),
                name: "locale".to_string(),
            }]
        );
        assert!(logs_contain("duplicate variable $locale"));
    }

    #[test]
    fn multiple_arguments_are_comma_separated() {
        let sdl = r#"
            type Query { product(id: ID!): Product }
            type Product @key(fields: "id") {
              id: ID!
              reviews(first: Int!, after: String): [String]
            }
        "#;
        let selection = SelectionNode::new("product").with_selection(
            SelectionNode::new("reviews")
                .with_argument("first", json!(5))
                .with_argument("after", json!("c1")),
        );

        let request = build(sdl, &selection).value.unwrap();

        assert_snapshot!(request.query, @"query($representations:[_Any!]! $first:Int! $after:String){_entities(representations:$representations){...on Product{__typename reviews(first:$first,after:$after) }}}");
    }

    #[test]
    fn undeclared_arguments_are_dropped() {
        let selection = SelectionNode::new("product")
            .with_selection(SelectionNode::new("name").with_argument("lang", json!("en")));

        let WithWarnings { value, warnings } = build(PRODUCTS_SDL, &selection);

        assert_eq!(
            value.unwrap().query,
            "query($representations:[_Any!]!){_entities(representations:$representations){...on Product{__typename name }}}"
        );
        assert_eq!(warnings.len(), 1);
    }
}
