//! HTTP client for live calls

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use super::{LiveRequest, LiveResponse, LiveTransport, TransportError};

/// Pooled HTTP/1.1 and HTTP/2 client for `http://` and `https://` targets
///
/// TLS uses rustls with the bundled webpki root certificates.
pub struct HttpClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HttpClient {
    /// Create a new HTTP client
    #[must_use]
    pub fn new() -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build(connector);

        Self { client }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LiveTransport for HttpClient {
    async fn perform(&self, request: &LiveRequest) -> Result<LiveResponse, TransportError> {
        let uri = request
            .url
            .parse::<Uri>()
            .map_err(|e| TransportError::new(format!("Invalid URI '{}': {e}", request.url)))?;

        debug!("Performing {} {}", request.method, uri);

        let method = request.method.parse::<Method>().map_err(|e| {
            TransportError::new(format!("Invalid HTTP method '{}': {e}", request.method))
        })?;

        let mut request_builder = Request::builder().method(method).uri(uri);
        for (name, value) in &request.headers {
            request_builder = request_builder.header(name, value);
        }

        let http_request = request_builder
            .body(Full::new(Bytes::copy_from_slice(&request.body)))
            .map_err(|e| TransportError::new(format!("Failed to build request: {e}")))?;

        let response = self.client.request(http_request).await.map_err(|e| {
            warn!("Request failed: {e}");
            TransportError::new(format!("Request failed: {e}"))
        })?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or("<invalid>").to_string(),
                )
            })
            .collect();

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportError::new(format!("Failed to read response body: {e}")))?
            .to_bytes();

        Ok(LiveResponse {
            status,
            headers,
            body: body_bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new();
        assert!(std::mem::size_of_val(&client) > 0);
    }

    #[tokio::test]
    async fn test_invalid_uri_is_transport_error() {
        let client = HttpClient::new();
        let request = LiveRequest {
            url: "not a url".to_string(),
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: vec![],
        };

        let err = client.perform(&request).await.unwrap_err();
        assert!(err.message().contains("Invalid URI"));
    }

    #[tokio::test]
    async fn test_invalid_method_is_transport_error() {
        let client = HttpClient::new();
        let request = LiveRequest {
            url: "http://127.0.0.1:1/".to_string(),
            method: "NOT A METHOD".to_string(),
            headers: BTreeMap::new(),
            body: vec![],
        };

        let err = client.perform(&request).await.unwrap_err();
        assert!(err.message().contains("Invalid HTTP method"));
    }
}
