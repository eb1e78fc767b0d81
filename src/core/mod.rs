//! Core pipe logic.
//!
//! This module contains:
//! - Pipe: the chat-pipe trait and shared preflight checks
//! - Intent: regex rule tables that read URLs, job ids, prompts and schemas
//! - Render: response formatting
//! - SingleTurnPipe: crawl, scrape and map
//! - ExtractPipe: the multi-turn extraction dialogue and its sessions

pub mod extract;
pub mod intent;
pub mod pipe;
pub mod render;
pub mod session;
pub mod single_turn;

// Re-export commonly used types
pub use extract::{advance, ExtractPipe, Step};
pub use pipe::{preflight, Pipe, Preflight, MISSING_API_KEY};
pub use session::{session_key, ConversationState, SessionStore, Stage};
pub use single_turn::{
    CrawlOperation, CrawlPipe, MapOperation, MapPipe, ScrapeOperation, ScrapePipe,
    SingleTurnOperation, SingleTurnPipe,
};
