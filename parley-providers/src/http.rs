//! HTTP client abstraction and utilities

use crate::error;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use parley_core::Error;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Type alias for raw response body streams
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// HTTP client abstraction
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a POST request and return the response body as a byte stream
    ///
    /// Resolves once a success status has been received. Connection failures
    /// and non-success statuses are reported as
    /// [`Error::UpstreamUnavailable`]; errors while reading the body surface
    /// as [`Error::UpstreamStream`] items of the returned stream.
    async fn post_stream(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Value,
    ) -> Result<ResponseStream, Error>;
}

/// Default HTTP client implementation using reqwest
///
/// Only the connect phase is bounded. A generation can legitimately run for
/// minutes, so no total request timeout is applied.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new HTTP client
    pub fn new(connect_timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestClient {
    async fn post_stream(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Value,
    ) -> Result<ResponseStream, Error> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(error::connect_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error::status_error(status, &text));
        }

        debug!(%url, %status, "Upstream accepted streaming request");
        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(error::body_error)),
        ))
    }
}

/// Headers for a JSON request answered with newline-delimited JSON
pub fn ndjson_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/x-ndjson"));
    headers
}
