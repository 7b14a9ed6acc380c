//! Components of the Feder gateway.
//!
//! The gateway discovers the schema of every configured subgraph, merges them with
//! [`feder_federation`] and serves the merged schema over HTTP. Entity fields are resolved by
//! sending `_entities` representation queries to the subgraphs that declare them.

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

mod axum_factory;
pub mod configuration;
pub mod error;
mod executable;
mod execution;
mod json_ext;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::axum_factory::bind;
pub use crate::axum_factory::make_router;
pub use crate::axum_factory::serve;
pub use crate::configuration::Configuration;
pub use crate::error::GatewayError;
pub use crate::executable::main;
pub use crate::state::GatewayState;
pub use crate::state::StateHandle;
