//! Implementations of the subgraph transport.

mod subgraph_service;

pub use subgraph_service::HttpSubgraphClient;
pub use subgraph_service::http_client;
