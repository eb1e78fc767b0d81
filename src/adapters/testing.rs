//! In-memory transport for tests.
//!
//! Responses are served in the order they were queued and every request is
//! recorded, so tests can assert on exactly what would have gone over the
//! wire.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{FirecrawlError, HttpRequest, HttpResponse, Result, Transport};

enum Canned {
    Response(HttpResponse),
    Failure(String),
}

/// Transport that replays queued responses and records requests
#[derive(Default)]
pub struct StubTransport {
    queue: Mutex<VecDeque<Canned>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a raw body
    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.push(Canned::Response(HttpResponse::new(status, body)))
    }

    /// Queue a response with a JSON body
    pub fn respond_json(&self, status: u16, body: Value) -> &Self {
        self.respond(status, body.to_string())
    }

    /// Queue a network-level failure
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.push(Canned::Failure(message.into()))
    }

    /// All requests seen so far, oldest first
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, canned: Canned) -> &Self {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(canned);
        self
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(Canned::Response(response)) => Ok(response),
            Some(Canned::Failure(message)) => Err(FirecrawlError::transport(message)),
            None => Err(FirecrawlError::transport("no stubbed response queued")),
        }
    }
}
