//! Names and definitions of the federation subgraph protocol.

use apollo_compiler::Name;
use apollo_compiler::name;

pub const ANY_SCALAR_NAME: Name = name!("_Any");
pub const FIELDSET_SCALAR_NAME: Name = name!("_FieldSet");
pub const SERVICE_TYPE: Name = name!("_Service");
pub const ENTITY_UNION_NAME: Name = name!("_Entity");

pub const ENTITIES_QUERY: Name = name!("_entities");
pub const SERVICE_SDL_QUERY: Name = name!("_service");
pub const REPRESENTATIONS_ARGUMENT_NAME: Name = name!("representations");

pub const KEY_DIRECTIVE_NAME: Name = name!("key");
pub const EXTENDS_DIRECTIVE_NAME: Name = name!("extends");
pub const EXTERNAL_DIRECTIVE_NAME: Name = name!("external");
pub const REQUIRES_DIRECTIVE_NAME: Name = name!("requires");
pub const PROVIDES_DIRECTIVE_NAME: Name = name!("provides");
pub const FIELDS_ARGUMENT_NAME: Name = name!("fields");

pub const QUERY_TYPE_NAME: Name = name!("Query");
pub const ID_SCALAR_NAME: Name = name!("ID");
pub const TYPENAME_FIELD_NAME: &str = "__typename";

/// The only entity identifier understood by the gateway.
pub const ID_FIELD_NAME: &str = "id";

/// Root operation types, never classified as entities by the `ID` field fallback.
pub const ROOT_TYPE_NAMES: [&str; 3] = ["Query", "Mutation", "Subscription"];

/// The operation asking a subgraph for its own SDL.
pub const SERVICE_SDL_OPERATION: &str = "{_service{sdl}}";

/// The type declaration `_entities` queries are built against.
pub const REPRESENTATIONS_VARIABLE_TYPE: &str = "[_Any!]!";

/// Federation definitions prepended to every subgraph SDL before it is parsed.
pub const FEDERATION_PREAMBLE: &str = r#"scalar _Any
scalar _FieldSet

type _Service {
  sdl: String
}

extend type Query {
  _entities(representations: [_Any!]!): [_Entity]!
  _service: _Service!
}

directive @external on FIELD_DEFINITION
directive @requires(fields: _FieldSet!) on FIELD_DEFINITION
directive @provides(fields: _FieldSet!) on FIELD_DEFINITION
directive @key(fields: _FieldSet!) repeatable on OBJECT | INTERFACE
directive @extends on OBJECT | INTERFACE

"#;

/// Prepends [`FEDERATION_PREAMBLE`] to a subgraph SDL.
pub fn with_preamble(sdl: &str) -> String {
    format!("{FEDERATION_PREAMBLE}{sdl}")
}

/// Names owned by the federation protocol: skipped when merging.
pub fn is_federation_name(name: &str) -> bool {
    name.starts_with('_')
}
