//! Configuration ("valves") for the Firecrawl pipes.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (FIRECRAWL_API_KEY, URL_LIMIT, ...)
//! 2. Config file (.firecrawl/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - $FIRECRAWL_PIPES_CONFIG if set
//! - Searches current directory and parents for .firecrawl/config.yaml
//! - Falls back to <config dir>/firecrawl-pipes/config.yaml
//!
//! The environment variable names are shared by all pipes, so the same
//! `URL_LIMIT` configures both the crawl and the map pipe.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::{redact_key, DEFAULT_BASE_URL};

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub crawl: CrawlValves,
    #[serde(default)]
    pub scrape: ScrapeValves,
    #[serde(default)]
    pub map: MapValves,
    #[serde(default)]
    pub extract: ExtractValves,
}

/// Crawl pipe options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlValves {
    pub default_format: String,
    pub only_main_content: bool,
    /// Milliseconds to wait before capturing each page
    pub wait_for: u64,
    pub max_depth: u32,
    pub url_limit: u32,
    /// Comma-separated path patterns
    pub include_paths: String,
    /// Comma-separated path patterns
    pub exclude_paths: String,
    pub ignore_sitemap: bool,
    pub ignore_query_params: bool,
    pub allow_backward_links: bool,
    pub allow_external_links: bool,
    pub block_ads: bool,
    pub remove_base64_images: bool,
    pub mobile: bool,
    /// Per-page timeout sent to the API, in milliseconds
    pub timeout: u64,
}

impl Default for CrawlValves {
    fn default() -> Self {
        Self {
            default_format: "markdown".to_string(),
            only_main_content: true,
            wait_for: 5000,
            max_depth: 3,
            url_limit: 100,
            include_paths: String::new(),
            exclude_paths: String::new(),
            ignore_sitemap: false,
            ignore_query_params: false,
            allow_backward_links: false,
            allow_external_links: false,
            block_ads: true,
            remove_base64_images: true,
            mobile: false,
            timeout: 30000,
        }
    }
}

/// Scrape pipe options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeValves {
    /// Comma-separated output formats; the first one is displayed
    pub formats: String,
    pub only_main_content: bool,
    pub include_tags: String,
    pub exclude_tags: String,
    /// JSON object of extra request headers
    pub headers: String,
    pub wait_for: u64,
    pub mobile: bool,
    pub timeout: u64,
    pub block_ads: bool,
    pub remove_base64_images: bool,
    /// `basic` or `stealth`; empty to let the API decide
    pub proxy: String,
    pub location_country: String,
    pub location_languages: String,
    /// JSON array of browser actions
    pub actions: String,
}

impl Default for ScrapeValves {
    fn default() -> Self {
        Self {
            formats: "markdown".to_string(),
            only_main_content: true,
            include_tags: String::new(),
            exclude_tags: String::new(),
            headers: String::new(),
            wait_for: 5000,
            mobile: false,
            timeout: 30000,
            block_ads: true,
            remove_base64_images: true,
            proxy: "basic".to_string(),
            location_country: "US".to_string(),
            location_languages: "en-US".to_string(),
            actions: String::new(),
        }
    }
}

/// Map pipe options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapValves {
    pub url_limit: u32,
    pub ignore_sitemap: bool,
    pub sitemap_only: bool,
    pub include_subdomains: bool,
}

impl Default for MapValves {
    fn default() -> Self {
        Self {
            url_limit: 100,
            ignore_sitemap: false,
            sitemap_only: false,
            include_subdomains: false,
        }
    }
}

/// Extract pipe options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractValves {
    pub default_format: String,
    pub only_main_content: bool,
    pub wait_for: u64,
    pub enable_web_search: bool,
    pub ignore_sitemap: bool,
    pub include_subdomains: bool,
    pub show_sources: bool,
    pub block_ads: bool,
    pub remove_base64_images: bool,
    pub mobile: bool,
    pub timeout: u64,
    pub location_country: String,
    pub location_languages: String,
    /// Ask for a "yes" once all slots are filled instead of dispatching
    pub confirm_before_dispatch: bool,
    /// Seconds a dialogue may sit idle before it is forgotten
    pub session_ttl_secs: u64,
    pub max_sessions: usize,
}

impl Default for ExtractValves {
    fn default() -> Self {
        Self {
            default_format: "markdown".to_string(),
            only_main_content: true,
            wait_for: 5000,
            enable_web_search: false,
            ignore_sitemap: false,
            include_subdomains: false,
            show_sources: false,
            block_ads: true,
            remove_base64_images: true,
            mobile: false,
            timeout: 30000,
            location_country: "US".to_string(),
            location_languages: "en-US".to_string(),
            confirm_before_dispatch: true,
            session_ttl_secs: 3600,
            max_sessions: 1000,
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    /// Transport-level request timeout
    pub http_timeout_secs: u64,
    pub crawl: CrawlValves,
    pub scrape: ScrapeValves,
    pub map: MapValves,
    pub extract: ExtractValves,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout_secs: 120,
            crawl: CrawlValves::default(),
            scrape: ScrapeValves::default(),
            map: MapValves::default(),
            extract: ExtractValves::default(),
            config_file: None,
        }
    }
}

impl Settings {
    /// Load from the process environment and the discovered config file
    pub fn load() -> Result<Self> {
        let config_file = std::env::var("FIRECRAWL_PIPES_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(find_config_file);
        Self::load_with(|name| std::env::var(name).ok(), config_file)
    }

    /// Load from an explicit environment lookup and optional config file
    pub fn load_with<F>(env: F, config_file: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match config_file.as_deref() {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        let mut settings = Settings {
            api_key: file.api_key.unwrap_or_default(),
            base_url: file
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http_timeout_secs: file.http_timeout_secs.unwrap_or(120),
            crawl: file.crawl,
            scrape: file.scrape,
            map: file.map,
            extract: file.extract,
            config_file,
        };

        settings.apply_env(&env)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject zero for every numeric limit, naming the env variable and YAML key
    pub fn validate(&self) -> Result<()> {
        let limits: [(&str, &str, u64); 12] = [
            ("FIRECRAWL_HTTP_TIMEOUT_SECS", "http_timeout_secs", self.http_timeout_secs),
            ("MAX_DEPTH", "crawl.max_depth", self.crawl.max_depth.into()),
            ("URL_LIMIT", "crawl.url_limit", self.crawl.url_limit.into()),
            ("WAIT_FOR", "crawl.wait_for", self.crawl.wait_for),
            ("TIMEOUT", "crawl.timeout", self.crawl.timeout),
            ("WAIT_FOR", "scrape.wait_for", self.scrape.wait_for),
            ("TIMEOUT", "scrape.timeout", self.scrape.timeout),
            ("URL_LIMIT", "map.url_limit", self.map.url_limit.into()),
            ("WAIT_FOR", "extract.wait_for", self.extract.wait_for),
            ("TIMEOUT", "extract.timeout", self.extract.timeout),
            ("EXTRACT_SESSION_TTL_SECS", "extract.session_ttl_secs", self.extract.session_ttl_secs),
            ("EXTRACT_MAX_SESSIONS", "extract.max_sessions", self.extract.max_sessions as u64),
        ];

        for (variable, key, value) in limits {
            if value == 0 {
                anyhow::bail!("Invalid value for {} ({}): must be greater than 0", variable, key);
            }
        }
        Ok(())
    }

    fn apply_env(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        env_string(env, "FIRECRAWL_API_KEY", &mut self.api_key);
        env_string(env, "FIRECRAWL_BASE_URL", &mut self.base_url);
        env_parse(env, "FIRECRAWL_HTTP_TIMEOUT_SECS", &mut self.http_timeout_secs)?;

        let c = &mut self.crawl;
        env_string(env, "DEFAULT_FORMAT", &mut c.default_format);
        env_bool(env, "ONLY_MAIN_CONTENT", &mut c.only_main_content)?;
        env_parse(env, "WAIT_FOR", &mut c.wait_for)?;
        env_parse(env, "MAX_DEPTH", &mut c.max_depth)?;
        env_parse(env, "URL_LIMIT", &mut c.url_limit)?;
        env_string(env, "INCLUDE_PATHS", &mut c.include_paths);
        env_string(env, "EXCLUDE_PATHS", &mut c.exclude_paths);
        env_bool(env, "IGNORE_SITEMAP", &mut c.ignore_sitemap)?;
        env_bool(env, "IGNORE_QUERY_PARAMS", &mut c.ignore_query_params)?;
        env_bool(env, "ALLOW_BACKWARD_LINKS", &mut c.allow_backward_links)?;
        env_bool(env, "ALLOW_EXTERNAL_LINKS", &mut c.allow_external_links)?;
        env_bool(env, "BLOCK_ADS", &mut c.block_ads)?;
        env_bool(env, "REMOVE_BASE64_IMAGES", &mut c.remove_base64_images)?;
        env_bool(env, "MOBILE", &mut c.mobile)?;
        env_parse(env, "TIMEOUT", &mut c.timeout)?;

        let s = &mut self.scrape;
        env_string(env, "FORMATS", &mut s.formats);
        env_bool(env, "ONLY_MAIN_CONTENT", &mut s.only_main_content)?;
        env_string(env, "INCLUDE_TAGS", &mut s.include_tags);
        env_string(env, "EXCLUDE_TAGS", &mut s.exclude_tags);
        env_string(env, "HEADERS", &mut s.headers);
        env_parse(env, "WAIT_FOR", &mut s.wait_for)?;
        env_bool(env, "MOBILE", &mut s.mobile)?;
        env_parse(env, "TIMEOUT", &mut s.timeout)?;
        env_bool(env, "BLOCK_ADS", &mut s.block_ads)?;
        env_bool(env, "REMOVE_BASE64_IMAGES", &mut s.remove_base64_images)?;
        env_string(env, "PROXY", &mut s.proxy);
        env_string(env, "LOCATION_COUNTRY", &mut s.location_country);
        env_string(env, "LOCATION_LANGUAGES", &mut s.location_languages);
        env_string(env, "ACTIONS", &mut s.actions);

        let m = &mut self.map;
        env_parse(env, "URL_LIMIT", &mut m.url_limit)?;
        env_bool(env, "IGNORE_SITEMAP", &mut m.ignore_sitemap)?;
        env_bool(env, "SITEMAP_ONLY", &mut m.sitemap_only)?;
        env_bool(env, "INCLUDE_SUBDOMAINS", &mut m.include_subdomains)?;

        let e = &mut self.extract;
        env_string(env, "DEFAULT_FORMAT", &mut e.default_format);
        env_bool(env, "ONLY_MAIN_CONTENT", &mut e.only_main_content)?;
        env_parse(env, "WAIT_FOR", &mut e.wait_for)?;
        env_bool(env, "ENABLE_WEB_SEARCH", &mut e.enable_web_search)?;
        env_bool(env, "IGNORE_SITEMAP", &mut e.ignore_sitemap)?;
        env_bool(env, "INCLUDE_SUBDOMAINS", &mut e.include_subdomains)?;
        env_bool(env, "SHOW_SOURCES", &mut e.show_sources)?;
        env_bool(env, "BLOCK_ADS", &mut e.block_ads)?;
        env_bool(env, "REMOVE_BASE64_IMAGES", &mut e.remove_base64_images)?;
        env_bool(env, "MOBILE", &mut e.mobile)?;
        env_parse(env, "TIMEOUT", &mut e.timeout)?;
        env_string(env, "LOCATION_COUNTRY", &mut e.location_country);
        env_string(env, "LOCATION_LANGUAGES", &mut e.location_languages);
        env_bool(
            env,
            "EXTRACT_CONFIRM_BEFORE_DISPATCH",
            &mut e.confirm_before_dispatch,
        )?;
        env_parse(env, "EXTRACT_SESSION_TTL_SECS", &mut e.session_ttl_secs)?;
        env_parse(env, "EXTRACT_MAX_SESSIONS", &mut e.max_sessions)?;

        Ok(())
    }

    /// Human-readable dump with the API key redacted
    pub fn describe(&self) -> Result<String> {
        let key = if self.api_key.is_empty() {
            "(not set)".to_string()
        } else {
            redact_key(&self.api_key)
        };
        let config_file = self
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());

        let mut out = String::new();
        out.push_str(&format!("Config file: {}\n", config_file));
        out.push_str(&format!("API key:     {}\n", key));
        out.push_str(&format!("Base URL:    {}\n", self.base_url));
        out.push_str(&format!("HTTP timeout: {}s\n\n", self.http_timeout_secs));
        for (name, section) in [
            ("crawl", serde_yaml::to_string(&self.crawl)?),
            ("scrape", serde_yaml::to_string(&self.scrape)?),
            ("map", serde_yaml::to_string(&self.map)?),
            ("extract", serde_yaml::to_string(&self.extract)?),
        ] {
            out.push_str(&format!("[{}]\n{}\n", name, section));
        }
        Ok(out)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(".firecrawl").join("config.yaml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    let user_config = dirs::config_dir()?
        .join("firecrawl-pipes")
        .join("config.yaml");
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn env_string(env: &dyn Fn(&str) -> Option<String>, name: &str, slot: &mut String) {
    if let Some(value) = env(name) {
        *slot = value;
    }
}

fn env_parse<T>(env: &dyn Fn(&str) -> Option<String>, name: &str, slot: &mut T) -> Result<()>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = env(name) {
        *slot = value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {:?} ({})", name, value, e))?;
    }
    Ok(())
}

fn env_bool(env: &dyn Fn(&str) -> Option<String>, name: &str, slot: &mut bool) -> Result<()> {
    if let Some(value) = env(name) {
        *slot = parse_bool(&value)
            .with_context(|| format!("Invalid boolean for {}: {:?}", name, value))?;
    }
    Ok(())
}

/// Parse the boolean spellings accepted in environment variables
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
