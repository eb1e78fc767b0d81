//! Adapter interfaces for external systems.
//!
//! The Firecrawl client talks to the network only through the `Transport`
//! trait, so the same client runs against reqwest in production and against
//! a canned stub in tests.

pub mod error;
pub mod firecrawl;
pub mod http;
pub mod testing;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Method;

// Re-export the client and transports
pub use error::{FirecrawlError, Result};
pub use firecrawl::{redact_key, FirecrawlClient, DEFAULT_BASE_URL};
pub use http::ReqwestTransport;
pub use testing::StubTransport;

/// An outgoing HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body (None for GET)
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A raw HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for issuing a single HTTP call
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return whatever status the server answered with.
    ///
    /// Only network-level failures are errors here; status classification is
    /// the client's job.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
