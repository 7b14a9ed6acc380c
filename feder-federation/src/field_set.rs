//! The `_FieldSet` scalar used by `@key`, `@requires` and `@provides`.

use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;

use crate::error::CoercionError;
use crate::subgraph::spec::FIELDS_ARGUMENT_NAME;
use crate::subgraph::spec::KEY_DIRECTIVE_NAME;
use crate::subgraph::spec::PROVIDES_DIRECTIVE_NAME;
use crate::subgraph::spec::REQUIRES_DIRECTIVE_NAME;

/// A coerced field set: the whitespace-separated selections of the literal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSet {
    selections: Vec<String>,
}

impl FieldSet {
    /// Coerces a `_FieldSet` literal.
    ///
    /// A string is split on whitespace; a list must hold only strings, whose selections are
    /// concatenated in order.
    pub fn from_literal(value: &ast::Value) -> Result<Self, CoercionError> {
        match value {
            ast::Value::String(s) => Ok(Self::parse(s)),
            ast::Value::List(items) => {
                let mut selections = Vec::new();
                for item in items {
                    match item.as_ref() {
                        ast::Value::String(s) => selections.extend(Self::parse(s).selections),
                        _ => return Err(CoercionError::ExpectedStringInList(value.to_string())),
                    }
                }
                Ok(Self { selections })
            }
            _ => Err(CoercionError::ExpectedStringOrList(value.to_string())),
        }
    }

    fn parse(s: &str) -> Self {
        Self {
            selections: s.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn selections(&self) -> &[String] {
        &self.selections
    }

    /// Whether the field set selects exactly `field_name`.
    pub fn is_single(&self, field_name: &str) -> bool {
        matches!(self.selections.as_slice(), [only] if only == field_name)
    }
}

/// Coerces every `fields:` argument of the federation directives applied in `schema`.
pub(crate) fn coerce_field_sets(schema: &Schema) -> Result<(), CoercionError> {
    for ty in schema.types.values() {
        if ty.is_built_in() {
            continue;
        }
        let (directives, fields) = match ty {
            ExtendedType::Object(object) => (&object.directives, &object.fields),
            ExtendedType::Interface(interface) => (&interface.directives, &interface.fields),
            _ => continue,
        };
        for key in directives.get_all(&KEY_DIRECTIVE_NAME) {
            coerce_fields_argument(key)?;
        }
        for field in fields.values() {
            for directive in field
                .directives
                .get_all(&REQUIRES_DIRECTIVE_NAME)
                .chain(field.directives.get_all(&PROVIDES_DIRECTIVE_NAME))
            {
                coerce_fields_argument(directive)?;
            }
        }
    }
    Ok(())
}

/// Coerces the `fields:` argument of one directive application, if present.
pub(crate) fn coerce_fields_argument(
    directive: &ast::Directive,
) -> Result<Option<FieldSet>, CoercionError> {
    directive
        .specified_argument_by_name(&FIELDS_ARGUMENT_NAME)
        .map(|value| FieldSet::from_literal(value))
        .transpose()
}
