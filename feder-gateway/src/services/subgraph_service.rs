//! JSON over HTTP transport to subgraphs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feder_federation::graphql;
use feder_federation::subgraph::SubgraphClient;
use feder_federation::subgraph::TransportError;
use http::HeaderValue;
use http::header::ACCEPT;
use http::header::CONTENT_TYPE;
use url::Url;

const GRAPHQL_JSON: &str = "application/json";

/// Builds the HTTP client shared by every subgraph.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().tcp_keepalive(Some(Duration::from_secs(5))).build()
}

/// Posts GraphQL requests to one subgraph endpoint.
#[derive(Clone)]
pub struct HttpSubgraphClient {
    http_client: reqwest::Client,
    service: Arc<String>,
    url: Arc<Url>,
}

impl HttpSubgraphClient {
    /// Construct a new http subgraph client that will post to the supplied URL.
    pub fn new(service: impl Into<String>, url: Url, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            service: Arc::new(service.into()),
            url: Arc::new(url),
        }
    }
}

#[async_trait]
impl SubgraphClient for HttpSubgraphClient {
    async fn request(
        &self,
        request: graphql::Request,
    ) -> Result<Option<graphql::Response>, TransportError> {
        tracing::trace!(
            service = %self.service,
            url = %self.url,
            query = %request.query,
            "request to subgraph"
        );
        let body = serde_json::to_vec(&request)
            .map_err(|error| TransportError::Fetch(format!("request serialization: {error}")))?;

        let response = self
            .http_client
            .post(self.url.as_str())
            .header(CONTENT_TYPE, HeaderValue::from_static(GRAPHQL_JSON))
            .header(ACCEPT, HeaderValue::from_static(GRAPHQL_JSON))
            .body(body)
            .send()
            .await
            .map_err(|error| TransportError::Fetch(error.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| TransportError::Fetch(error.to_string()))?;
        tracing::trace!(service = %self.service, %status, "response from subgraph");

        if bytes.iter().all(u8::is_ascii_whitespace) {
            if status.is_success() {
                return Ok(None);
            }
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason: "empty body".to_string(),
            });
        }
        match serde_json::from_slice::<graphql::Response>(&bytes) {
            Ok(response) => Ok(Some(response)),
            Err(_) if !status.is_success() => Err(TransportError::Status {
                status: status.as_u16(),
                reason: String::from_utf8_lossy(&bytes).into_owned(),
            }),
            Err(error) => Err(TransportError::MalformedResponse(error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::body_json;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    use super::*;

    async fn client(server: &MockServer) -> HttpSubgraphClient {
        HttpSubgraphClient::new(
            "products",
            format!("{}/graphql", server.uri()).parse().unwrap(),
            http_client().unwrap(),
        )
    }

    #[tokio::test]
    async fn posts_json_and_parses_the_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"query": "{_service{sdl}}"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"data": {"_service": {"sdl": "type Query { a: Int }"}}}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .await
            .request(graphql::Request::new("{_service{sdl}}"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            serde_json::to_value(response.data).unwrap(),
            json!({"_service": {"sdl": "type Query { a: Int }"}})
        );
    }

    #[tokio::test]
    async fn empty_body_is_no_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let response = client(&server).await.request(graphql::Request::new("{a}")).await.unwrap();

        assert!(response.is_none());
    }

    #[tokio::test]
    async fn error_status_with_graphql_body_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"errors": [{"message": "bad query"}]})),
            )
            .mount(&server)
            .await;

        let response = client(&server)
            .await
            .request(graphql::Request::new("{a}"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.error_messages(), "bad query");
    }

    #[tokio::test]
    async fn error_status_without_graphql_body_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let error = client(&server)
            .await
            .request(graphql::Request::new("{a}"))
            .await
            .unwrap_err();

        assert_eq!(
            error,
            TransportError::Status {
                status: 502,
                reason: "bad gateway".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn unreachable_subgraph() {
        let client = HttpSubgraphClient::new(
            "nowhere",
            "http://127.0.0.1:1/graphql".parse().unwrap(),
            http_client().unwrap(),
        );

        let error = client.request(graphql::Request::new("{a}")).await.unwrap_err();

        assert!(matches!(error, TransportError::Fetch(_)));
    }
}
