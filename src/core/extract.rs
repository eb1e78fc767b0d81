//! Multi-turn extraction pipe.
//!
//! Collects three slots over one or more messages (what to extract, which
//! URLs, and the JSON schema of the result) and then starts an extract job.
//! Slot filling is a pure function of the current state and the message
//! (`advance`); the pipe wraps it with session lookup and the network call.
//!
//! The session lock is never held across the dispatch await. A failed
//! dispatch leaves the slots in place so the user can retry with "yes".

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::intent::{
    contains_any, extract_job_id, extract_prompt, extract_schema, extract_urls, is_blank,
    is_status_request, parse_location, JobKind,
};
use super::pipe::{error_reply, log_startup, preflight, trace_invocation, Pipe, Preflight};
use super::render;
use super::session::{session_key, ConversationState, SessionStore, Stage};
use crate::adapters::FirecrawlClient;
use crate::config::ExtractValves;
use crate::domain::{ChatMessage, ExtractRequest, ScrapeOptions};

pub const PIPE_NAME: &str = "Firecrawl Data Extraction Pipeline";

const WELCOME: &str = "👋 Hello! Welcome to the Firecrawl Data Extraction Pipeline.\n\n\
I'll help you extract structured data from websites. To get started, please tell me:\n\n\
1. What you want to extract (e.g., 'Extract the founder's name from a website')\n\
2. The URL(s) of the website(s)\n\
3. The JSON schema for the data structure (must be a valid JSON object)\n\n\
You can also check the status of a previous extraction job by typing: check status of [job-id]\n\n\
Let's begin! What would you like to extract?";

const RESTART_WORDS: &[&str] = &["restart", "start over", "reset", "begin again"];
const CONFIRM_WORDS: &[&str] = &["yes", "proceed", "continue", "go ahead", "extract", "start"];
const CHANGE_WORDS: &[&str] = &["no", "change", "modify", "update", "edit"];

const EXAMPLE_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "founders": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {
          "name": {
            "type": "string"
          }
        },
        "required": [
          "name"
        ]
      }
    }
  },
  "required": [
    "founders"
  ]
}"#;

const ASK_PROMPT: &str = "Please tell me what you want to extract from the website. For example: 'Extract the founder's name' or 'Find product prices and descriptions'.";
const ASK_URLS: &str = "I need the URL(s) of the website(s) you want to extract data from. Please provide at least one valid URL.";
const ASK_CHANGES: &str = "What would you like to change? You can update the prompt, URLs, or schema.";
const ASK_PROCEED: &str = "I have all the information needed for extraction. Please say 'yes' to proceed, 'no' to make changes, or 'restart' to start over.";

fn schema_request(lead: &str) -> String {
    format!(
        "{}\n\nNow, please provide ONLY the JSON schema for the data in your next message.\n\nHere's an example schema that would extract an array of founders with their names:\n\n```json\n{}\n```",
        lead, EXAMPLE_SCHEMA
    )
}

fn schema_missing() -> String {
    format!(
        "I need a valid JSON schema to structure the extracted data. Please provide ONLY the schema JSON in your next message.\n\nHere's an example schema that would extract an array of founders with their names:\n\n```json\n{}\n```\n\nPlease refer to the documentation or the example above for the proper schema format.",
        EXAMPLE_SCHEMA
    )
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// What the dialogue wants to do after a message
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Reply(String),
    /// All slots are filled and the user wants the job started
    Dispatch,
}

/// Advance the dialogue by one message.
///
/// Mutates `state` with whatever slots the message fills. With
/// `confirm_before_dispatch` set, filling the last slot asks for confirmation
/// instead of dispatching straight away.
pub fn advance(state: &mut ConversationState, message: &str, confirm_before_dispatch: bool) -> Step {
    match state.stage() {
        Stage::Empty => {
            let prompt = extract_prompt(message);
            if !prompt.is_explicit() {
                return Step::Reply(ASK_PROMPT.to_string());
            }
            state.prompt = Some(prompt.text.clone());

            let urls = extract_urls(message);
            if urls.is_empty() {
                return Step::Reply(format!(
                    "Great! I'll extract: '{}'\n\nNow, please provide the URL(s) of the website(s) you want to extract data from.",
                    prompt.text
                ));
            }
            state.urls = urls;

            let schema = extract_schema(message);
            if is_blank(&schema) {
                return Step::Reply(schema_request(&format!("Great! I'll extract: '{}'", prompt.text)));
            }
            state.schema = Some(schema);

            slots_complete(state, confirm_before_dispatch)
        }
        Stage::HavePrompt => {
            let urls = extract_urls(message);
            if urls.is_empty() {
                return Step::Reply(ASK_URLS.to_string());
            }
            state.urls = urls;
            Step::Reply(schema_request("Thanks for the URL(s)."))
        }
        Stage::HavePromptAndUrls => {
            let schema = extract_schema(message);
            if is_blank(&schema) {
                return Step::Reply(schema_missing());
            }
            state.schema = Some(schema);
            slots_complete(state, confirm_before_dispatch)
        }
        Stage::HaveAll => revise(state, message),
    }
}

fn slots_complete(state: &ConversationState, confirm_before_dispatch: bool) -> Step {
    if confirm_before_dispatch {
        Step::Reply(format!(
            "{}\n\nShall I start the extraction? Say 'yes' to proceed, 'no' to make changes, or 'restart' to start over.",
            summary(state)
        ))
    } else {
        Step::Dispatch
    }
}

/// All slots are filled: accept updates, a go-ahead, or a change request
fn revise(state: &mut ConversationState, message: &str) -> Step {
    let urls = extract_urls(message);
    if !urls.is_empty() {
        let reply = format!(
            "I've updated the URLs to: {}. Do you want to proceed with the extraction using the current prompt and schema?",
            urls.join(", ")
        );
        state.urls = urls;
        return Step::Reply(reply);
    }

    let schema = extract_schema(message);
    if !is_blank(&schema) {
        let reply = format!(
            "I've updated the schema to: {}. Do you want to proceed with the extraction using the current prompt and URLs?",
            pretty(&schema)
        );
        state.schema = Some(schema);
        return Step::Reply(reply);
    }

    let prompt = extract_prompt(message);
    if prompt.is_explicit() {
        let reply = format!(
            "I've updated the prompt to: '{}'. Do you want to proceed with the extraction using the current URLs and schema?",
            prompt.text
        );
        state.prompt = Some(prompt.text);
        return Step::Reply(reply);
    }

    if contains_any(message, CONFIRM_WORDS) {
        return Step::Dispatch;
    }

    if contains_any(message, CHANGE_WORDS) {
        return Step::Reply(ASK_CHANGES.to_string());
    }

    Step::Reply(ASK_PROCEED.to_string())
}

fn summary(state: &ConversationState) -> String {
    let empty = Value::Object(Default::default());
    render::extraction_summary(
        state.prompt.as_deref().unwrap_or_default(),
        &state.urls,
        state.schema.as_ref().unwrap_or(&empty),
    )
}

/// Conversational extraction pipe
pub struct ExtractPipe {
    client: FirecrawlClient,
    valves: ExtractValves,
    sessions: SessionStore,
}

impl ExtractPipe {
    pub fn new(client: FirecrawlClient, valves: ExtractValves) -> Self {
        let sessions = SessionStore::with_limits(
            Duration::from_secs(valves.session_ttl_secs),
            valves.max_sessions,
        );
        Self {
            client,
            valves,
            sessions,
        }
    }

    pub fn client(&self) -> &FirecrawlClient {
        &self.client
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Build the start request from filled slots; None until all are present
    pub fn request(&self, state: &ConversationState) -> Option<ExtractRequest> {
        let v = &self.valves;
        Some(ExtractRequest {
            urls: state.urls.clone(),
            prompt: state.prompt.clone()?,
            schema: state.schema.clone()?,
            enable_web_search: v.enable_web_search,
            ignore_sitemap: v.ignore_sitemap,
            include_subdomains: v.include_subdomains,
            show_sources: v.show_sources,
            scrape_options: ScrapeOptions {
                formats: vec![v.default_format.clone()],
                only_main_content: v.only_main_content,
                wait_for: v.wait_for,
                mobile: v.mobile,
                timeout: v.timeout,
                remove_base64_images: v.remove_base64_images,
                block_ads: v.block_ads,
                location: parse_location(&v.location_country, &v.location_languages),
            },
        })
        .filter(|r| !r.urls.is_empty())
    }

    async fn check_status(&self, job_id: &str) -> String {
        if self.client.debug() {
            info!("Checking status for extract ID: {}", job_id);
        }

        match self.client.extract_status(job_id).await {
            Ok(response) => match response.error.as_deref() {
                Some(error) if !error.is_empty() => {
                    format!("Error getting extraction status: {}", error)
                }
                _ => render::extract_result(&response),
            },
            Err(e) => error_reply("Error getting extraction status", e, self.client.debug()),
        }
    }

    async fn dispatch(&self, key: &str, state: &ConversationState) -> String {
        let Some(request) = self.request(state) else {
            return ASK_PROCEED.to_string();
        };
        let lead = format!("{}\n\nProcessing your request now...", summary(state));

        match self.client.extract(&request).await {
            Ok(response) => {
                self.sessions.reset(key);
                info!(session = key, job_id = %response.id, "Extraction job started");
                render::extract_started(&lead, &response)
            }
            Err(e) => error_reply("Error during extraction operation", e, self.client.debug()),
        }
    }
}

#[async_trait]
impl Pipe for ExtractPipe {
    fn name(&self) -> &str {
        PIPE_NAME
    }

    async fn on_startup(&self) {
        log_startup(PIPE_NAME, &self.client);
    }

    async fn on_shutdown(&self) {
        debug!("on_shutdown:{}", PIPE_NAME);
    }

    async fn pipe(
        &self,
        user_message: &str,
        model_id: &str,
        _messages: &[ChatMessage],
        body: &Value,
    ) -> String {
        trace_invocation(&self.client, user_message, model_id, body);
        let key = session_key(body);

        match preflight(&self.client, user_message, body) {
            Preflight::Title => return PIPE_NAME.to_string(),
            Preflight::Greeting => {
                if self.sessions.reset(&key) {
                    info!(session = %key, "Session reset by greeting");
                }
                return WELCOME.to_string();
            }
            Preflight::Reply(reply) => return reply,
            Preflight::Proceed => {}
        }

        if contains_any(user_message, RESTART_WORDS) {
            self.sessions.reset(&key);
            info!(session = %key, "Session restarted");
            return "Let's start over. What would you like to extract?".to_string();
        }

        if is_status_request(user_message) {
            if let Some(job_id) = extract_job_id(user_message, JobKind::Extract) {
                return self.check_status(&job_id).await;
            }
        }

        let mut state = self.sessions.get(&key);
        let step = advance(&mut state, user_message, self.valves.confirm_before_dispatch);
        if self.client.debug() {
            info!(session = %key, stage = ?state.stage(), "Dialogue advanced");
        }
        self.sessions.save(&key, state.clone());

        match step {
            Step::Reply(reply) => reply,
            Step::Dispatch => self.dispatch(&key, &state).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StubTransport;
    use serde_json::json;
    use std::sync::Arc;

    const SCHEMA_MSG: &str = "```json\n{\"type\": \"object\"}\n```";

    fn filled() -> ConversationState {
        ConversationState {
            prompt: Some("founders".to_string()),
            urls: vec!["https://a.com".to_string()],
            schema: Some(json!({"type": "object"})),
        }
    }

    #[test]
    fn test_empty_stage_asks_for_prompt() {
        let mut state = ConversationState::default();
        assert_eq!(advance(&mut state, "yes", true), Step::Reply(ASK_PROMPT.to_string()));
        assert_eq!(state.stage(), Stage::Empty);
    }

    #[test]
    fn test_prompt_then_urls_then_schema() {
        let mut state = ConversationState::default();

        let step = advance(&mut state, r#"prompt: "the founders""#, true);
        assert!(matches!(step, Step::Reply(r) if r.starts_with("Great! I'll extract: 'the founders'")));
        assert_eq!(state.stage(), Stage::HavePrompt);

        assert_eq!(advance(&mut state, "no links here", true), Step::Reply(ASK_URLS.to_string()));

        let step = advance(&mut state, "https://Example.com/team", true);
        assert!(matches!(step, Step::Reply(r) if r.starts_with("Thanks for the URL(s).")));
        assert_eq!(state.urls, vec!["https://example.com/team"]);

        assert_eq!(advance(&mut state, "not a schema", true), Step::Reply(schema_missing()));

        let step = advance(&mut state, SCHEMA_MSG, true);
        assert!(matches!(step, Step::Reply(r) if r.contains("Shall I start the extraction?")));
        assert_eq!(state.stage(), Stage::HaveAll);
    }

    #[test]
    fn test_single_message_fills_all_slots() {
        let mut state = ConversationState::default();
        let message = format!(r#"extract: "team names" from https://a.com {}"#, SCHEMA_MSG);
        assert_eq!(advance(&mut state, &message, false), Step::Dispatch);
        assert_eq!(state.prompt.as_deref(), Some("team names"));
        assert_eq!(state.urls, vec!["https://a.com"]);
    }

    #[test]
    fn test_prompt_and_url_requests_schema_with_example() {
        let mut state = ConversationState::default();
        let step = advance(&mut state, "Extract pricing from https://a.com", true);
        match step {
            Step::Reply(r) => {
                assert!(r.starts_with("Great! I'll extract: 'pricing from'"));
                assert!(r.contains("\"founders\""));
            }
            other => panic!("unexpected step: {:?}", other),
        }
        assert_eq!(state.stage(), Stage::HavePromptAndUrls);
    }

    #[test]
    fn test_revise_order() {
        let mut state = filled();
        let step = advance(&mut state, "use https://b.com instead", true);
        assert!(matches!(step, Step::Reply(r) if r.starts_with("I've updated the URLs to: https://b.com.")));
        assert_eq!(state.urls, vec!["https://b.com"]);

        let step = advance(&mut state, r#"{"type": "array"}"#, true);
        assert!(matches!(step, Step::Reply(r) if r.starts_with("I've updated the schema to:")));
        assert_eq!(state.schema, Some(json!({"type": "array"})));

        let step = advance(&mut state, r#"prompt: "the CEO""#, true);
        assert!(matches!(step, Step::Reply(r) if r.starts_with("I've updated the prompt to: 'the CEO'")));
        assert_eq!(state.stage(), Stage::HaveAll);
    }

    #[test]
    fn test_confirm_change_and_fallback() {
        let mut state = filled();
        assert_eq!(advance(&mut state, "yes", true), Step::Dispatch);
        assert_eq!(advance(&mut state, "no", true), Step::Reply(ASK_CHANGES.to_string()));
        assert_eq!(advance(&mut state, "hmm", true), Step::Reply(ASK_PROCEED.to_string()));
    }

    #[test]
    fn test_request_from_slots() {
        let client = FirecrawlClient::with_transport("k", Arc::new(StubTransport::new()));
        let pipe = ExtractPipe::new(client, ExtractValves::default());

        assert!(pipe.request(&ConversationState::default()).is_none());

        let request = pipe.request(&filled()).unwrap();
        assert_eq!(request.prompt, "founders");
        assert_eq!(request.scrape_options.formats, vec!["markdown"]);
        assert_eq!(
            request.scrape_options.location.and_then(|l| l.country),
            Some("US".to_string())
        );
    }

    #[tokio::test]
    async fn test_status_check_does_not_touch_session() {
        let stub = Arc::new(StubTransport::new());
        let pipe = ExtractPipe::new(
            FirecrawlClient::with_transport("fc-key", stub.clone()),
            ExtractValves::default(),
        );
        pipe.sessions().save("default", filled());
        stub.respond_json(402, json!({"error": "insufficient credits"}));

        let reply = pipe.pipe("check status of ex-1", "m", &[], &json!({})).await;

        assert_eq!(reply, "Error getting extraction status: insufficient credits");
        assert_eq!(pipe.sessions().get("default"), filled());
        assert!(stub.requests()[0].url.ends_with("/extract/ex-1"));
    }

    #[tokio::test]
    async fn test_restart_clears_session() {
        let pipe = ExtractPipe::new(
            FirecrawlClient::with_transport("fc-key", Arc::new(StubTransport::new())),
            ExtractValves::default(),
        );
        pipe.sessions().save("default", filled());

        let reply = pipe.pipe("let's start over", "m", &[], &json!({})).await;
        assert_eq!(reply, "Let's start over. What would you like to extract?");
        assert!(pipe.sessions().is_empty());
    }
}
