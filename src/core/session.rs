//! Extraction dialogue state.
//!
//! Each conversation owns one `ConversationState`, stored in a `SessionStore`
//! under a key taken from the host's request body. The stage is derived from
//! which slots are filled, so there is no separate state field to keep in sync.
//!
//! Sessions idle longer than the store's TTL read back as empty and are pruned
//! on the next save. When the store is full, saving a new session evicts the
//! least recently touched one.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Key used when the host does not identify the conversation
pub const DEFAULT_SESSION: &str = "default";

/// Slots collected so far in one conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub prompt: Option<String>,
    pub urls: Vec<String>,
    pub schema: Option<Value>,
}

/// Dialogue stage, derived from the filled slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Empty,
    HavePrompt,
    HavePromptAndUrls,
    HaveAll,
}

impl ConversationState {
    pub fn stage(&self) -> Stage {
        match (&self.prompt, self.urls.is_empty(), &self.schema) {
            (None, _, _) => Stage::Empty,
            (Some(_), true, _) => Stage::HavePrompt,
            (Some(_), false, None) => Stage::HavePromptAndUrls,
            (Some(_), false, Some(_)) => Stage::HaveAll,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stage() == Stage::Empty
    }
}

/// Idle time after which a session is forgotten
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Most sessions kept at once
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug)]
struct Entry {
    state: ConversationState,
    touched: Instant,
}

/// Conversation states by session key
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a custom idle TTL and capacity (at least one session)
    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of a session; unknown and expired keys start empty
    pub fn get(&self, key: &str) -> ConversationState {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(key) {
            Some(entry) if entry.touched.elapsed() < self.ttl => entry.state.clone(),
            Some(_) => {
                sessions.remove(key);
                ConversationState::default()
            }
            None => ConversationState::default(),
        }
    }

    pub fn save(&self, key: &str, state: ConversationState) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if state == ConversationState::default() {
            sessions.remove(key);
            return;
        }

        sessions.retain(|_, entry| entry.touched.elapsed() < self.ttl);

        if !sessions.contains_key(key) && sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(session = %oldest, "Evicting least recently used session");
                sessions.remove(&oldest);
            }
        }

        sessions.insert(
            key.to_string(),
            Entry {
                state,
                touched: Instant::now(),
            },
        );
    }

    /// Forget a session. Returns true if it held any state.
    pub fn reset(&self, key: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Session key from the host body: `session_id`, `chat_id`, then
/// `metadata.chat_id`
pub fn session_key(body: &Value) -> String {
    let candidates = [
        body.get("session_id"),
        body.get("chat_id"),
        body.get("metadata").and_then(|m| m.get("chat_id")),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_SESSION.to_string())
}
