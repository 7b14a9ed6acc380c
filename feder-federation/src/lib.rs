//! ## Usage
//!
//! This crate holds the federation machinery of the Feder gateway: subgraph schema discovery,
//! entity classification, schema merging and the construction of `_entities` representation
//! queries. It knows nothing about HTTP or about the engine executing client operations; those
//! live in `feder-gateway`.
//!
//! The usual flow is:
//!
//! 1. describe every subgraph with a [`subgraph::SubgraphDescriptor`],
//! 2. turn each one into a [`subgraph::SubgraphSchema`] with a [`subgraph::SubgraphSchemaBuilder`],
//! 3. merge them with [`merge::merge_subgraphs`],
//! 4. call the [`resolver::Resolver`] bound to each federated field while executing a query.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod entity_fetcher;
pub mod error;
pub mod field_set;
pub mod graphql;
pub mod json_ext;
pub mod merge;
pub mod representation;
pub mod resolver;
pub mod selection;
pub mod subgraph;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::error::FederationError;
pub use crate::merge::MergedSchema;
pub use crate::merge::merge_subgraphs;
pub use crate::resolver::Resolver;
pub use crate::selection::SelectionNode;
pub use crate::subgraph::SubgraphDescriptor;
pub use crate::subgraph::SubgraphSchema;
pub use crate::subgraph::SubgraphSchemaBuilder;
