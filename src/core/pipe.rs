//! The chat-pipe contract and the checks every pipe runs first.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::intent::{extract_api_key, is_blank, is_greeting};
use crate::adapters::FirecrawlClient;
use crate::domain::ChatMessage;

/// Reply when no API key is configured
pub const MISSING_API_KEY: &str =
    "Error: FIRECRAWL_API_KEY not set. Please set it in your environment variables.";

/// A chat-invocable unit that turns one user message into one reply.
///
/// Implementations never fail: every error is rendered into the reply text.
#[async_trait]
pub trait Pipe: Send + Sync {
    /// Display name, also returned when the host asks for a conversation title
    fn name(&self) -> &str;

    async fn on_startup(&self);

    async fn on_shutdown(&self);

    async fn pipe(
        &self,
        user_message: &str,
        model_id: &str,
        messages: &[ChatMessage],
        body: &Value,
    ) -> String;
}

/// Outcome of the shared pre-dispatch checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preflight {
    /// Host asked for a conversation title
    Title,
    /// Empty message or greeting; show the welcome text
    Greeting,
    /// Answered without reaching the pipe's own logic
    Reply(String),
    Proceed,
}

/// Title, greeting, API key and admin-command checks, in that order
pub fn preflight(client: &FirecrawlClient, user_message: &str, body: &Value) -> Preflight {
    if body.get("title").is_some_and(|t| !is_blank(t)) {
        return Preflight::Title;
    }

    if is_greeting(user_message) {
        return Preflight::Greeting;
    }

    if !client.has_api_key() {
        return Preflight::Reply(MISSING_API_KEY.to_string());
    }

    let lower = user_message.to_lowercase();

    if lower.contains("set api key") {
        let reply = match extract_api_key(user_message) {
            Some(key) => {
                let shown: String = key.chars().take(4).collect();
                client.set_api_key(key);
                info!("API key updated");
                format!("API key has been updated. First 4 characters: {}...", shown)
            }
            None => "Could not extract API key from message. Format should be: set api key YOUR_API_KEY"
                .to_string(),
        };
        return Preflight::Reply(reply);
    }

    if lower.contains("debug on") {
        client.set_debug(true);
        info!("Debug mode enabled");
        return Preflight::Reply(
            "Debug mode has been enabled. Detailed logs will now be shown.".to_string(),
        );
    }

    if lower.contains("debug off") {
        client.set_debug(false);
        debug!("Debug mode disabled");
        return Preflight::Reply("Debug mode has been disabled.".to_string());
    }

    if lower.contains("debug status") {
        let state = if client.debug() { "enabled" } else { "disabled" };
        return Preflight::Reply(format!("Debug mode is currently {}.", state));
    }

    Preflight::Proceed
}

/// Log the incoming invocation when debug mode is on
pub fn trace_invocation(client: &FirecrawlClient, user_message: &str, model_id: &str, body: &Value) {
    if client.debug() {
        info!("User message: {}", user_message);
        info!("Model ID: {}", model_id);
        info!(
            "Body: {}",
            serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
        );
    }
}

/// Shared startup hook body
pub fn log_startup(name: &str, client: &FirecrawlClient) {
    debug!("on_startup:{}", name);
    if !client.has_api_key() {
        warn!("FIRECRAWL_API_KEY not set. Pipeline will not function correctly.");
    }
    if client.debug() {
        info!("Debug mode is enabled. Detailed logs will be shown.");
    }
}

/// Render an error as reply text, appending the error chain in debug mode
pub fn error_reply(context: &str, err: impl Into<anyhow::Error>, debug_mode: bool) -> String {
    let err = err.into();
    let message = format!("{}: {}", context, err);
    error!("{}", message);

    if debug_mode {
        error!("{:?}", err);
        format!("{}\n\nDebug traceback:\n{:?}", message, err)
    } else {
        message
    }
}
