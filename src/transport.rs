use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

/// Status line and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response (DNS, connect, abort, bad header).
#[derive(Debug, thiserror::Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, bearer: &str) -> Result<RawResponse, TransportError>;

    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: &Value,
    ) -> Result<RawResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }

    fn headers(bearer: &str) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|_| TransportError("credential is not a valid header value".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn finish(response: reqwest::Response) -> Result<RawResponse, TransportError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        debug!(status, bytes = body.len(), "response received");
        Ok(RawResponse { status, body })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, bearer: &str) -> Result<RawResponse, TransportError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .headers(Self::headers(bearer)?)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Self::finish(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: &Value,
    ) -> Result<RawResponse, TransportError> {
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .headers(Self::headers(bearer)?)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Self::finish(response).await
    }
}
