//! Domain types for the Firecrawl pipes.
//!
//! This module contains the wire-level data structures:
//! - Operation: descriptor table for the six API calls
//! - Requests and responses for crawl, scrape, map and extract
//! - Shared types: scrape options, page metadata, job status, chat messages

pub mod common;
pub mod crawl;
pub mod extract;
pub mod map;
pub mod operation;
pub mod scrape;

// Re-export commonly used types
pub use common::{ApiResponse, ChatMessage, JobStatus, Location, PageMetadata, ScrapeOptions};
pub use crawl::{CrawlDocument, CrawlRequest, CrawlResponse, CrawlStatusResponse};
pub use extract::{ExtractRequest, ExtractResponse, ExtractStatusResponse};
pub use map::{MapRequest, MapResponse};
pub use operation::{ErrorPolicy, Method, Operation};
pub use scrape::{ScrapeData, ScrapeRequest, ScrapeResponse};
