//! Message-intent parsing.
//!
//! Turns free chat text into the pieces a pipe needs: URLs, job ids, search
//! terms, extraction prompts and JSON schemas. Every multi-pattern lookup is an
//! ordered rule table evaluated first-match-wins.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::domain::Location;

/// Prompt used when a message carries no usable extraction instruction
pub const DEFAULT_PROMPT: &str = "Extract the main content and key information from this webpage.";

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("invalid built-in pattern {:?}: {}", pattern, e))
}

// =============================================================================
// URLs
// =============================================================================

static RE_SINGLE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://(?:[-\w.]|%[\da-fA-F]{2})+(?:[/?#][^\s"'<>]*)?"#).unwrap()
});

static RE_ANY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s]+|www\.[^\s]+|(?:[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})[^\s]*").unwrap()
});

static RE_NORMALIZE: LazyLock<Regex> = LazyLock::new(|| {
    case_insensitive(r"^(?:(https?)://)?(www\.)?([a-zA-Z0-9.-]+)(\.[a-zA-Z]{2,})(/.*)?$")
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// First http(s) URL in the message, exactly as written.
///
/// The match stops at whitespace, quotes and angle brackets. Trailing
/// sentence punctuation is dropped, and so is a trailing `)` that has no
/// opening partner inside the URL.
pub fn extract_url(message: &str) -> Option<String> {
    let found = RE_SINGLE_URL.find(message)?;
    Some(trim_url_tail(found.as_str()).to_string())
}

fn trim_url_tail(mut url: &str) -> &str {
    loop {
        let trimmed = url.trim_end_matches(TRAILING_PUNCTUATION);
        match trimmed.strip_suffix(')') {
            Some(rest) if trimmed.matches(')').count() > trimmed.matches('(').count() => url = rest,
            _ => return trimmed,
        }
    }
}

/// Every URL-looking token in the message, normalized
pub fn extract_urls(message: &str) -> Vec<String> {
    raw_urls(message).map(normalize_url).collect()
}

fn raw_urls(message: &str) -> impl Iterator<Item = &str> {
    RE_ANY_URL.find_iter(message).map(|m| m.as_str())
}

/// Lower-case the scheme, `www.` prefix, host and top-level suffix of a URL.
///
/// The path and query keep their casing. A bare host gets `http://`.
/// Input that does not look like a URL is returned unchanged.
pub fn normalize_url(url: &str) -> String {
    let Some(caps) = RE_NORMALIZE.captures(url) else {
        return url.to_string();
    };

    let scheme = caps
        .get(1)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| "http".to_string());
    let www = caps.get(2).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
    let host = caps[3].to_lowercase();
    let suffix = caps[4].to_lowercase();
    let path = caps.get(5).map(|m| m.as_str()).unwrap_or_default();

    format!("{}://{}{}{}{}", scheme, www, host, suffix, path)
}

// =============================================================================
// Commands
// =============================================================================

static RE_GREETING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(hi|hello|hey|start|begin|help)(\s|$)").unwrap());

static RE_API_KEY: LazyLock<Regex> =
    LazyLock::new(|| case_insensitive(r"set api key[:\s]+([a-zA-Z0-9_\-]+)"));

/// Empty messages count as greetings
pub fn is_greeting(message: &str) -> bool {
    message.is_empty() || RE_GREETING.is_match(&message.to_lowercase())
}

/// Case-insensitive substring test against a keyword list
pub fn contains_any(message: &str, keywords: &[&str]) -> bool {
    let lower = message.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Key from a `set api key <key>` command
pub fn extract_api_key(message: &str) -> Option<String> {
    RE_API_KEY.captures(message).map(|caps| caps[1].to_string())
}

// =============================================================================
// Job ids
// =============================================================================

/// Which job family a status request refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Crawl,
    Extract,
}

static JOB_ID_CRAWL: LazyLock<Vec<Regex>> = LazyLock::new(|| job_id_rules("crawl"));
static JOB_ID_EXTRACT: LazyLock<Vec<Regex>> = LazyLock::new(|| job_id_rules("extract"));

fn job_id_rules(verb: &str) -> Vec<Regex> {
    [
        r"status of ([\w-]+)".to_string(),
        r"check ([\w-]+)".to_string(),
        format!(r"{} ([\w-]+)", verb),
        r"id ([\w-]+)".to_string(),
        r"job ([\w-]+)".to_string(),
    ]
    .iter()
    .map(|p| case_insensitive(p))
    .collect()
}

/// Job id referenced in the message, if any
pub fn extract_job_id(message: &str, kind: JobKind) -> Option<String> {
    let rules = match kind {
        JobKind::Crawl => &*JOB_ID_CRAWL,
        JobKind::Extract => &*JOB_ID_EXTRACT,
    };
    first_capture(rules, message)
}

/// A message asks for job status when it names a job and says so
pub fn is_status_request(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("status") || lower.contains("check")
}

fn first_capture(rules: &[Regex], message: &str) -> Option<String> {
    rules
        .iter()
        .find_map(|re| re.captures(message))
        .map(|caps| caps[1].to_string())
}

// =============================================================================
// Search terms and prompts
// =============================================================================

static SEARCH_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"search for "(.*?)""#,
        r#"search "(.*?)""#,
        r#"find "(.*?)""#,
        r#"containing "(.*?)""#,
        r#"with "(.*?)""#,
        r#"include "(.*?)""#,
    ]
    .into_iter()
    .map(case_insensitive)
    .collect()
});

/// Quoted search term for the map pipe; empty when none
pub fn extract_search_term(message: &str) -> String {
    first_capture(&SEARCH_RULES, message).unwrap_or_default()
}

static PROMPT_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"prompt[:\s]+"(.*?)""#,
        r#"extract[:\s]+"(.*?)""#,
        r#"with prompt[:\s]+"(.*?)""#,
        r#"using prompt[:\s]+"(.*?)""#,
    ]
    .into_iter()
    .map(case_insensitive)
    .collect()
});

const PROMPT_INDICATORS: &[&str] = &["extract", "find", "get", "retrieve", "pull", "scrape"];

const PROMPT_PREFIXES: &[&str] = &[
    "please",
    "can you",
    "could you",
    "i want to",
    "i need to",
    "extract",
    "find",
    "get",
    "retrieve",
    "from the website",
];

/// Which rule produced a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    Quoted,
    Message,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub source: PromptSource,
}

impl Prompt {
    /// The fixed fallback does not count as the user saying what they want
    pub fn is_explicit(&self) -> bool {
        self.source != PromptSource::Default && self.text != DEFAULT_PROMPT
    }
}

/// Work out what the user wants extracted.
///
/// Quoted prompts win. Otherwise a message mentioning an extraction verb is
/// used as the prompt after its URLs and leading command words are removed.
/// Failing both, the default prompt is returned.
pub fn extract_prompt(message: &str) -> Prompt {
    if let Some(text) = first_capture(&PROMPT_RULES, message) {
        return Prompt {
            text,
            source: PromptSource::Quoted,
        };
    }

    let lower = message.to_lowercase();
    if PROMPT_INDICATORS.iter().any(|w| lower.contains(w)) {
        let mut clean = message.to_string();
        for url in raw_urls(message) {
            clean = clean.replace(url, "");
        }

        for prefix in PROMPT_PREFIXES {
            let head = clean.get(..prefix.len());
            if head.is_some_and(|h| h.eq_ignore_ascii_case(prefix)) {
                clean = clean[prefix.len()..].trim().to_string();
            }
        }

        let clean = clean.trim();
        if !clean.is_empty() {
            return Prompt {
                text: clean.to_string(),
                source: PromptSource::Message,
            };
        }
    }

    Prompt {
        text: DEFAULT_PROMPT.to_string(),
        source: PromptSource::Default,
    }
}

// =============================================================================
// Schemas
// =============================================================================

static RE_CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:python|json)?\s*\n?([\s\S]*?)\n?```").unwrap());

static RE_BRACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\{[\s\S]*?\})").unwrap());

/// JSON schema embedded in the message, or an empty object.
///
/// Fenced code blocks are tried first, then brace-delimited substrings with
/// whitespace removed. The brace scan is non-greedy, so nested objects outside
/// a code block usually fail to parse.
pub fn extract_schema(message: &str) -> Value {
    for caps in RE_CODE_BLOCK.captures_iter(message) {
        let block = caps[1].trim();
        match serde_json::from_str::<Value>(block) {
            Ok(schema) => return schema,
            Err(e) => tracing::debug!("Failed to parse JSON from code block: {} ({})", block, e),
        }
    }

    for caps in RE_BRACES.captures_iter(message) {
        let candidate: String = caps[1]
            .chars()
            .filter(|c| !matches!(c, '\n' | '\r' | ' '))
            .collect();
        match serde_json::from_str::<Value>(&candidate) {
            Ok(schema) => return schema,
            Err(e) => tracing::debug!("Failed to parse JSON from message: {} ({})", candidate, e),
        }
    }

    Value::Object(Map::new())
}

/// True for JSON values that carry nothing: null, false, 0, "", [] and {}
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

// =============================================================================
// Option strings
// =============================================================================

/// Split a comma-separated option into trimmed, non-empty items
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Output formats, defaulting to markdown
pub fn parse_formats(value: &str) -> Vec<String> {
    let formats = parse_list(value);
    if formats.is_empty() {
        vec!["markdown".to_string()]
    } else {
        formats
    }
}

/// Extra request headers given as a JSON object
pub fn parse_headers(value: &str) -> BTreeMap<String, String> {
    if value.trim().is_empty() {
        return BTreeMap::new();
    }
    match serde_json::from_str::<BTreeMap<String, String>>(value) {
        Ok(headers) => headers,
        Err(e) => {
            tracing::error!("Failed to parse headers JSON: {} ({})", value, e);
            BTreeMap::new()
        }
    }
}

/// Browser actions given as a JSON array
pub fn parse_actions(value: &str) -> Vec<Value> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(value) {
        Ok(Value::Array(actions)) => actions,
        Ok(other) => {
            tracing::error!("Actions must be a list, got: {}", other);
            Vec::new()
        }
        Err(e) => {
            tracing::error!("Failed to parse actions JSON: {} ({})", value, e);
            Vec::new()
        }
    }
}

/// Location hint from a country and a comma-separated language list
pub fn parse_location(country: &str, languages: &str) -> Option<Location> {
    let country = country.trim();
    let location = Location {
        country: (!country.is_empty()).then(|| country.to_string()),
        languages: parse_list(languages),
    };
    (!location.is_empty()).then_some(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_url_in_text() {
        assert_eq!(
            extract_url("please scrape https://example.com for me").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            extract_url("crawl https://docs.rs/regex/latest/regex/, thanks").as_deref(),
            Some("https://docs.rs/regex/latest/regex/")
        );
        assert_eq!(
            extract_url("see http://a.example.org/x?q=1.").as_deref(),
            Some("http://a.example.org/x?q=1")
        );
        assert_eq!(extract_url("no link here"), None);
        assert_eq!(extract_url("example.com without scheme"), None);
    }

    #[test]
    fn test_extract_url_stops_at_delimiters() {
        assert_eq!(
            extract_url(r#"scrape "https://example.com/docs" please"#).as_deref(),
            Some("https://example.com/docs")
        );
        assert_eq!(
            extract_url("scrape 'https://example.com/docs'").as_deref(),
            Some("https://example.com/docs")
        );
        assert_eq!(
            extract_url("see <https://example.com/a> now").as_deref(),
            Some("https://example.com/a")
        );
    }

    #[test]
    fn test_extract_url_parentheses() {
        assert_eq!(
            extract_url("scrape https://en.wikipedia.org/wiki/Rust_(programming_language)").as_deref(),
            Some("https://en.wikipedia.org/wiki/Rust_(programming_language)")
        );
        assert_eq!(
            extract_url("the docs (https://example.com/guide).").as_deref(),
            Some("https://example.com/guide")
        );
        assert_eq!(
            extract_url("read [the guide](https://example.com/guide) first").as_deref(),
            Some("https://example.com/guide")
        );
        assert_eq!(
            extract_url("[Rust](https://en.wikipedia.org/wiki/Rust_(language))").as_deref(),
            Some("https://en.wikipedia.org/wiki/Rust_(language)")
        );
    }

    #[test]
    fn test_extract_urls_normalizes() {
        assert_eq!(
            extract_urls("from https://Example.COM/About-Us and www.Foo.org"),
            vec!["https://example.com/About-Us", "http://www.foo.org"]
        );
        assert!(extract_urls("nothing to see").is_empty());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("HTTP://WWW.Example.Com/Path?Q=A"), "http://www.example.com/Path?Q=A");
        assert_eq!(normalize_url("example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        // Ports don't match the pattern and pass through unchanged
        assert_eq!(normalize_url("http://LocalHost:8080"), "http://LocalHost:8080");
    }

    #[test]
    fn test_greetings() {
        assert!(is_greeting(""));
        assert!(is_greeting("Hello"));
        assert!(is_greeting("hi there"));
        assert!(is_greeting("help\n"));
        assert!(!is_greeting("history of https://example.com"));
        assert!(!is_greeting("say hi"));
    }

    #[test]
    fn test_api_key_command() {
        assert_eq!(extract_api_key("Set API Key: fc-abc_123").as_deref(), Some("fc-abc_123"));
        assert_eq!(extract_api_key("set api key"), None);
        assert!(contains_any("Please RESTART", &["restart", "reset"]));
        assert!(!contains_any("carry on", &["restart", "reset"]));
    }

    #[test]
    fn test_job_id_patterns() {
        assert_eq!(
            extract_job_id("check status of abc-123", JobKind::Crawl).as_deref(),
            Some("abc-123")
        );
        assert_eq!(
            extract_job_id("Check 9f8e-77", JobKind::Extract).as_deref(),
            Some("9f8e-77")
        );
        assert_eq!(
            extract_job_id("what about job XYZ_1", JobKind::Crawl).as_deref(),
            Some("XYZ_1")
        );
        assert_eq!(
            extract_job_id("crawl abc", JobKind::Extract),
            None,
            "verb rule is per job kind"
        );
        assert_eq!(extract_job_id("hello there", JobKind::Crawl), None);
    }

    #[test]
    fn test_status_request_detection() {
        assert!(is_status_request("Check status of abc"));
        assert!(is_status_request("what's the STATUS"));
        assert!(!is_status_request("job abc"));
    }

    #[test]
    fn test_search_term_order() {
        assert_eq!(extract_search_term(r#"map https://x.com search for "docs""#), "docs");
        assert_eq!(extract_search_term(r#"urls containing "blog""#), "blog");
        assert_eq!(extract_search_term("map https://x.com"), "");
    }

    #[test]
    fn test_quoted_prompt() {
        let prompt = extract_prompt(r#"prompt: "Get the founders""#);
        assert_eq!(prompt.text, "Get the founders");
        assert_eq!(prompt.source, PromptSource::Quoted);
        assert!(prompt.is_explicit());
    }

    #[test]
    fn test_heuristic_prompt_strips_urls_and_prefixes() {
        let prompt = extract_prompt("Please extract the pricing tiers from https://example.com");
        assert_eq!(prompt.source, PromptSource::Message);
        assert_eq!(prompt.text, "the pricing tiers from");
    }

    #[test]
    fn test_default_prompt_is_not_explicit() {
        let prompt = extract_prompt("yes");
        assert_eq!(prompt.text, DEFAULT_PROMPT);
        assert!(!prompt.is_explicit());

        // Only command words left after stripping
        let prompt = extract_prompt("extract");
        assert!(!prompt.is_explicit());
    }

    #[test]
    fn test_schema_from_code_block() {
        let message = "here you go\n```json\n{\"a\":1}\n```";
        assert_eq!(extract_schema(message), json!({"a": 1}));
    }

    #[test]
    fn test_schema_from_inline_braces() {
        let message = r#"use { "type": "object" } please"#;
        assert_eq!(extract_schema(message), json!({"type": "object"}));
    }

    #[test]
    fn test_malformed_schema_is_empty() {
        assert_eq!(extract_schema("```json\n{\"a\": }\n```"), json!({}));
        assert_eq!(extract_schema("{not json"), json!({}));
        assert!(is_blank(&extract_schema("no schema")));
    }

    #[test]
    fn test_nested_inline_schema_misfires() {
        // Non-greedy brace scan stops at the first closing brace
        let message = r#"{"a": {"b": 1}}"#;
        assert_eq!(extract_schema(message), json!({}));

        // The same object in a code block parses fine
        let fenced = format!("```\n{}\n```", message);
        assert_eq!(extract_schema(&fenced), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&json!({})));
        assert!(is_blank(&json!([])));
        assert!(is_blank(&json!(0)));
        assert!(!is_blank(&json!({"a": 1})));
        assert!(!is_blank(&json!(1)));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" /blog , ,/docs,"), vec!["/blog", "/docs"]);
        assert!(parse_list("   ").is_empty());
        assert_eq!(parse_formats(""), vec!["markdown"]);
        assert_eq!(parse_formats("html, links"), vec!["html", "links"]);
    }

    #[test]
    fn test_parse_headers_and_actions() {
        let headers = parse_headers(r#"{"User-Agent": "bot"}"#);
        assert_eq!(headers.get("User-Agent").map(String::as_str), Some("bot"));
        assert!(parse_headers("{broken").is_empty());

        let actions = parse_actions(r#"[{"type": "wait", "milliseconds": 2}]"#);
        assert_eq!(actions.len(), 1);
        assert!(parse_actions(r#"{"type": "wait"}"#).is_empty());
        assert!(parse_actions("").is_empty());
    }

    #[test]
    fn test_parse_location() {
        let loc = parse_location("US", "en-US, de-DE").unwrap();
        assert_eq!(loc.country.as_deref(), Some("US"));
        assert_eq!(loc.languages, vec!["en-US", "de-DE"]);
        assert_eq!(parse_location(" ", ""), None);
    }
}
