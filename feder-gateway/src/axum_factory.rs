//! HTTP surface of the gateway.

use std::future::Future;
use std::net::SocketAddr;

use apollo_compiler::ast;
use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use feder_federation::graphql;
use feder_federation::json_ext::Object;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::configuration::Server;
use crate::error::GatewayError;
use crate::state::StateHandle;

pub(crate) const GRAPHQL_RESPONSE_CONTENT_TYPE: &str = "application/graphql+json;charset=utf-8";

/// Routes of the GraphQL endpoint, the schema printout and the health check.
pub fn make_router(state: StateHandle, server: &Server) -> Router {
    let schema_path = format!("{}/schema.graphql", server.path.trim_end_matches('/'));
    Router::new()
        .route(&server.path, get(handle_get).post(handle_post))
        .route(&schema_path, get(handle_schema))
        .layer(TraceLayer::new_for_http())
        .route(&server.health_check_path, get(health_check))
        .with_state(state)
}

pub async fn bind(listen: SocketAddr) -> Result<TcpListener, GatewayError> {
    TcpListener::bind(listen)
        .await
        .map_err(|error| GatewayError::Bind {
            address: listen,
            error,
        })
}

/// Serves `router` until `shutdown` completes.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), GatewayError> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(GatewayError::Serve)
}

/// Query string of a GET request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetRequest {
    query: String,
    #[serde(default)]
    variables: Option<String>,
    #[serde(default)]
    operation_name: Option<String>,
}

impl GetRequest {
    fn into_graphql_request(self) -> Result<graphql::Request, String> {
        let variables = match self.variables.as_deref() {
            None | Some("") => Object::new(),
            Some(variables) => serde_json::from_str(variables)
                .map_err(|error| format!("invalid variables: {error}"))?,
        };
        Ok(graphql::Request::new(self.query)
            .with_variables(variables)
            .with_operation_name(self.operation_name))
    }
}

async fn handle_get(
    State(state): State<StateHandle>,
    Query(request): Query<GetRequest>,
) -> Response {
    let request = match request.into_graphql_request() {
        Ok(request) => request,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    if is_mutation(&request.query, request.operation_name.as_deref()) {
        return error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Mutations can only be sent over HTTP POST".to_string(),
        );
    }
    graphql_response(state.current().execute(request).await)
}

async fn handle_post(
    State(state): State<StateHandle>,
    Json(request): Json<graphql::Request>,
) -> Response {
    graphql_response(state.current().execute(request).await)
}

async fn handle_schema(State(state): State<StateHandle>) -> impl IntoResponse {
    let content_type = HeaderValue::from_static("text/plain; charset=utf-8");
    let sdl = state.current().schema_sdl().to_string();
    ([(CONTENT_TYPE, content_type)], sdl)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "pass" }))
}

fn graphql_response(response: graphql::Response) -> Response {
    let content_type = HeaderValue::from_static(GRAPHQL_RESPONSE_CONTENT_TYPE);
    ([(CONTENT_TYPE, content_type)], Json(response)).into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    let errors = vec![graphql::Error::new(message)];
    let mut response = graphql_response(graphql::Response::from_errors(errors));
    *response.status_mut() = status;
    response
}

/// Whether the operation `operation_name` selects is a mutation.
///
/// Documents that do not parse are left to the engine to reject.
fn is_mutation(query: &str, operation_name: Option<&str>) -> bool {
    let Ok(document) = ast::Document::parse(query, "query.graphql") else {
        return false;
    };
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            ast::Definition::OperationDefinition(operation) => Some(operation),
            _ => None,
        })
        .filter(|operation| {
            operation_name.is_none_or(|name| {
                operation
                    .name
                    .as_ref()
                    .is_some_and(|operation| operation.as_str() == name)
            })
        })
        .any(|operation| operation.operation_type == ast::OperationType::Mutation)
}
