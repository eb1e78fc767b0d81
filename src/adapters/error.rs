//! Error types for the Firecrawl client.

use thiserror::Error;

/// Result type for Firecrawl client operations.
pub type Result<T> = std::result::Result<T, FirecrawlError>;

/// Firecrawl client errors.
#[derive(Debug, Error)]
pub enum FirecrawlError {
    /// The API rejected the request (HTTP 400); carries the echoed body
    #[error("API returned 400 Bad Request: {0}")]
    BadRequest(String),

    /// Any other non-2xx response not converted into a typed response
    #[error("Request failed: {status} {} Error: {reason} for url: {url}", class_of(.status))]
    Http {
        status: u16,
        reason: String,
        url: String,
    },

    /// Connection, timeout or body-read failure
    #[error("Request failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A 2xx body that does not match the expected response shape
    #[error("Request failed: invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn class_of(status: &u16) -> &'static str {
    if *status >= 500 {
        "Server"
    } else {
        "Client"
    }
}

impl FirecrawlError {
    pub fn transport(message: impl Into<String>) -> Self {
        FirecrawlError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FirecrawlError::BadRequest(_) => Some(400),
            FirecrawlError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
