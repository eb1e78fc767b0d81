//! firecrawl-pipes - Chat pipes for the Firecrawl web data API
//!
//! Four conversational pipes that turn chat messages into Firecrawl calls
//! and render the results as markdown replies.
//!
//! # Architecture
//!
//! Every pipe is a `Pipe` that takes one user message and returns one reply:
//! - Crawl, scrape and map are single-turn: find a URL, call the API, render
//! - Extract is a multi-turn dialogue that collects a prompt, URLs and a JSON
//!   schema per session before starting a job
//! - All network traffic goes through one `FirecrawlClient`, driven by a
//!   table of operations and their status-code policies
//!
//! # Modules
//!
//! - `adapters`: Firecrawl client, HTTP transports, error types
//! - `core`: Pipes, message-intent parsing, result rendering, sessions
//! - `domain`: Wire types (requests, responses, operations)
//! - `config`: Valves loaded from env and YAML
//! - `cli`: Command-line host
//!
//! # Usage
//!
//! ```bash
//! # Scrape a page
//! firecrawl-pipes ask --pipe scrape https://example.com
//!
//! # Walk through an extraction interactively
//! firecrawl-pipes chat --pipe extract
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{FirecrawlClient, FirecrawlError, StubTransport};
pub use config::Settings;
pub use crate::core::{CrawlPipe, ExtractPipe, MapPipe, Pipe, ScrapePipe};
pub use domain::{ChatMessage, Operation};
