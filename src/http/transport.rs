//! Transport capability: one HTTP request per call, bounded by a timeout.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::Method;
use crate::request::PreparedRequest;

/// Status code plus raw body, content-type-agnostic.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// The body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level failures.
#[derive(Debug)]
pub enum TransportError {
    /// The per-attempt timeout elapsed; treated as retryable upstream.
    Timeout(String),
    /// Any other connection-level failure.
    Network(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            TransportError::Network(msg) => write!(f, "Network failure: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Issues a single HTTP request.
///
/// TLS, pooling, and proxying belong to the implementation; the pipeline only
/// depends on this contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &PreparedRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
        Method::Head => reqwest::Method::HEAD,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(uri = %request.uri, method = %request.method))]
    async fn send(
        &self,
        request: &PreparedRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Network(format!("invalid header name {:?}: {}", name, e)))?;
            let mut value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Network(format!("invalid header value: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.target_uri())
            .headers(headers)
            .timeout(timeout);

        if let Some(body) = request.body() {
            builder = builder.body(body.to_string());
        }

        debug!("{} {}...", request.method, request.uri);

        let response = builder.send().await.map_err(classify_send_error)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(classify_send_error)?
            .to_vec();

        debug!("{} {} -> HTTP {}", request.method, request.uri, status);

        Ok(RawResponse { status, body })
    }
}

fn classify_send_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Payload;
    use std::collections::BTreeMap;

    fn prepared(method: Method, uri: &str, payload: Payload) -> PreparedRequest {
        PreparedRequest {
            method,
            uri: uri.to_string(),
            headers: BTreeMap::new(),
            payload,
        }
    }

    #[tokio::test]
    async fn test_send_post_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/llm")
            .match_body(r#"{"text": "hi"}"#)
            .with_status(200)
            .with_body(r#"{"text": "hello"}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::default();
        let request = prepared(
            Method::Post,
            &format!("{}/llm", server.url()),
            Payload::Body(r#"{"text": "hi"}"#.to_string()),
        );

        let response = transport
            .send(&request, Duration::from_secs(5))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), r#"{"text": "hello"}"#);
    }

    #[tokio::test]
    async fn test_send_get_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/llm?q=hi")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let transport = ReqwestTransport::default();
        let request = prepared(
            Method::Get,
            &format!("{}/llm", server.url()),
            Payload::Query("q=hi".to_string()),
        );

        let response = transport
            .send(&request, Duration::from_secs(5))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_send_forwards_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/llm")
            .match_header("x-authorization", "s3cret")
            .with_status(200)
            .create_async()
            .await;

        let transport = ReqwestTransport::default();
        let mut request = prepared(
            Method::Post,
            &format!("{}/llm", server.url()),
            Payload::Body(String::new()),
        );
        request
            .headers
            .insert("X-Authorization".to_string(), "s3cret".to_string());

        transport
            .send(&request, Duration::from_secs(5))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_reports_status_without_erroring() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/llm")
            .with_status(500)
            .create_async()
            .await;

        let transport = ReqwestTransport::default();
        let request = prepared(
            Method::Post,
            &format!("{}/llm", server.url()),
            Payload::Body(String::new()),
        );

        // classification is the pipeline's job; transport just reports
        let response = transport
            .send(&request, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let transport = ReqwestTransport::default();
        // port 1 is essentially never listening
        let request = prepared(
            Method::Post,
            "http://127.0.0.1:1/llm",
            Payload::Body(String::new()),
        );

        let result = transport.send(&request, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(TransportError::Network(_))));
    }

    #[tokio::test]
    async fn test_invalid_header_name_is_network_error() {
        let transport = ReqwestTransport::default();
        let mut request = prepared(
            Method::Post,
            "http://127.0.0.1:1/llm",
            Payload::Body(String::new()),
        );
        request
            .headers
            .insert("bad header\n".to_string(), "v".to_string());

        let result = transport.send(&request, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(TransportError::Network(_))));
    }
}
