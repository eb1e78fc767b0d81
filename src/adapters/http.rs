//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;

use super::{FirecrawlError, HttpRequest, HttpResponse, Result, Transport};
use crate::domain::Method;

/// Default request timeout applied by the transport
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP transport using a shared reqwest client
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    /// Create a transport with the default timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| FirecrawlError::Transport {
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();

        let body = response.text().await.map_err(|e| FirecrawlError::Transport {
            message: format!("failed to read response body: {}", e),
            source: Some(Box::new(e)),
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
