//! Result formatting.
//!
//! Every function here is pure: a typed API response in, chat-ready
//! markdown text out.

use std::fmt::Write;

use serde_json::Value;

use super::intent::is_blank;
use crate::domain::{
    CrawlResponse, CrawlStatusResponse, ExtractResponse, ExtractStatusResponse, JobStatus,
    MapResponse, PageMetadata, ScrapeResponse,
};

fn outcome(success: bool) -> &'static str {
    if success {
        "successful"
    } else {
        "failed"
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn crawl_started(response: &CrawlResponse) -> String {
    format!(
        "Crawl job started with ID: {id}. Status: {}\n\nTo check the status later, ask: 'Check status of {id}'",
        outcome(response.success),
        id = response.id,
    )
}

pub fn crawl_status(response: &CrawlStatusResponse) -> String {
    let mut out = format!("Crawl job status: {}\n\n", response.status);
    let _ = writeln!(out, "Total URLs: {}", response.total);
    let _ = writeln!(out, "Completed: {}", response.completed);
    let _ = writeln!(out, "Credits used: {}", response.credits_used);

    if let Some(expires) = response.expires_at.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Expires at: {}", expires);
    }

    if !response.data.is_empty() {
        out.push_str("\nList of all crawled pages:\n");
        for (i, page) in response.data.iter().enumerate() {
            let meta = page.metadata.as_ref();
            let title = meta.and_then(|m| m.title.as_deref()).unwrap_or("No title");
            let url = meta
                .and_then(|m| m.source_url.as_deref())
                .unwrap_or("Unknown URL");
            let _ = writeln!(out, "{}. {} - {}", i + 1, title, url);
        }
    }

    out
}

/// Render scraped content in the requested primary format
pub fn scrape_result(response: &ScrapeResponse, format: &str) -> String {
    let Some(data) = response.data.as_ref().filter(|d| !d.is_empty()) else {
        return "No content was extracted from the URL.".to_string();
    };

    let Some(content) = data.content(format) else {
        return "No content was extracted in the requested format.".to_string();
    };

    let mut out = format!("### Extracted Content\n\n{}\n\n", content);

    if let Some(meta) = data.metadata.as_ref().filter(|m| **m != PageMetadata::default()) {
        out.push_str("### Metadata\n\n");
        let fields = [
            ("Title", &meta.title),
            ("Description", &meta.description),
            ("Language", &meta.language),
        ];
        for (label, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                let _ = write!(out, "**{}:** {}\n\n", label, value);
            }
        }
    }

    if !data.links.is_empty() {
        out.push_str("### Links Found\n\n");
        for (i, link) in data.links.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, link);
        }
    }

    if let Some(warning) = data.warning.as_deref().filter(|w| !w.is_empty()) {
        let _ = write!(out, "\n⚠️ **Warning:** {}\n", warning);
    }

    out
}

pub fn map_result(response: &MapResponse, url: &str, search: &str) -> String {
    let mut out = if search.is_empty() {
        format!("Found {} URLs on {}.", response.links.len(), url)
    } else {
        format!(
            "Found {} URLs on {} containing '{}'.",
            response.links.len(),
            url,
            search
        )
    };

    out.push_str("\n\nList of mapped URLs:");
    if response.links.is_empty() {
        out.push_str("\nNothing was found []");
    } else {
        for link in &response.links {
            let _ = write!(out, "\n- {}", link);
        }
    }

    out
}

/// Summary of the three extraction slots
pub fn extraction_summary(prompt: &str, urls: &[String], schema: &Value) -> String {
    format!(
        "Great! I'll extract the following data:\n\n- Prompt: {}\n- URLs: {}\n- Schema: {}",
        prompt,
        urls.join(", "),
        pretty(schema)
    )
}

pub fn extract_started(summary: &str, response: &ExtractResponse) -> String {
    format!(
        "{summary}\n\nExtraction job started with ID: {id}. Status: {}\n\nTo check the status and results later, ask: 'Check status of {id}'",
        outcome(response.success),
        summary = summary,
        id = response.id,
    )
}

pub fn extract_result(response: &ExtractStatusResponse) -> String {
    if is_blank(&response.data) {
        return if response.status == JobStatus::Processing {
            "The extraction is still processing. Please try checking the status again in a few moments."
                .to_string()
        } else {
            "No data was extracted.".to_string()
        };
    }

    let mut out = String::from("### Extracted Data\n\n");

    match &response.data {
        Value::Object(fields) => {
            for (key, value) in fields {
                match value {
                    Value::Object(_) | Value::Array(_) => {
                        let _ = write!(out, "**{}**:\n```json\n{}\n```\n\n", key, pretty(value));
                    }
                    Value::String(s) => {
                        let _ = write!(out, "**{}**: {}\n\n", key, s);
                    }
                    other => {
                        let _ = write!(out, "**{}**: {}\n\n", key, other);
                    }
                }
            }
        }
        Value::Array(_) => {
            let _ = write!(out, "```json\n{}\n```\n\n", pretty(&response.data));
        }
        Value::String(s) => {
            let _ = write!(out, "{}\n\n", s);
        }
        other => {
            let _ = write!(out, "{}\n\n", other);
        }
    }

    let status = response.status.as_str();
    if !status.is_empty() {
        let _ = write!(out, "**Status**: {}\n\n", status);
    }

    if let Some(expires) = response.expires_at.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(out, "**Expires at**: {}\n\n", expires);
    }

    if let Some(warning) = response.warning.as_deref().filter(|w| !w.is_empty()) {
        let _ = write!(out, "\n⚠️ **Warning**: {}\n", warning);
    }

    out
}
