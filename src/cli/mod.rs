//! Command-line interface for firecrawl-pipes.
//!
//! Hosts any of the four pipes in a terminal: an interactive chat loop, a
//! one-shot `ask`, and a `config` dump of the resolved valves.

use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::adapters::{FirecrawlClient, ReqwestTransport};
use crate::config::Settings;
use crate::core::{CrawlOperation, ExtractPipe, MapOperation, Pipe, ScrapeOperation, SingleTurnPipe};
use crate::domain::ChatMessage;

/// firecrawl-pipes - Chat pipes for the Firecrawl API
#[derive(Parser, Debug)]
#[command(name = "firecrawl-pipes")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with a pipe interactively (reads one message per line)
    Chat {
        /// Which pipe to run
        #[arg(short, long, value_enum)]
        pipe: PipeKind,

        /// Session id (random if not provided)
        #[arg(short, long)]
        session: Option<String>,

        /// Model id passed through to the pipe
        #[arg(short, long, default_value = "firecrawl")]
        model: String,
    },

    /// Send a single message and print the reply
    Ask {
        /// Which pipe to run
        #[arg(short, long, value_enum)]
        pipe: PipeKind,

        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Show resolved configuration
    Config,
}

/// Pipe selection for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PipeKind {
    /// Crawl a site, or check a crawl job
    Crawl,

    /// Scrape one page
    Scrape,

    /// List the URLs of a site
    Map,

    /// Multi-turn structured extraction
    Extract,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Chat {
                pipe,
                session,
                model,
            } => {
                let settings = Settings::load()?;
                chat(pipe, &settings, session, &model).await
            }
            Commands::Ask { pipe, message } => {
                let settings = Settings::load()?;
                ask(pipe, &settings, &message.join(" ")).await
            }
            Commands::Config => show_config(),
        }
    }
}

/// Build a client from resolved settings
pub fn build_client(settings: &Settings) -> FirecrawlClient {
    let transport = ReqwestTransport::with_timeout(Duration::from_secs(settings.http_timeout_secs));
    FirecrawlClient::with_transport(settings.api_key.clone(), Arc::new(transport))
        .with_base_url(settings.base_url.clone())
}

/// Build the selected pipe from resolved settings
pub fn build_pipe(kind: PipeKind, settings: &Settings) -> Box<dyn Pipe> {
    let client = build_client(settings);
    match kind {
        PipeKind::Crawl => Box::new(SingleTurnPipe::new(
            client,
            CrawlOperation::new(settings.crawl.clone()),
        )),
        PipeKind::Scrape => Box::new(SingleTurnPipe::new(
            client,
            ScrapeOperation::new(settings.scrape.clone()),
        )),
        PipeKind::Map => Box::new(SingleTurnPipe::new(
            client,
            MapOperation::new(settings.map.clone()),
        )),
        PipeKind::Extract => Box::new(ExtractPipe::new(client, settings.extract.clone())),
    }
}

/// Interactive chat loop
async fn chat(kind: PipeKind, settings: &Settings, session: Option<String>, model: &str) -> Result<()> {
    let pipe = build_pipe(kind, settings);
    let session = session.unwrap_or_else(|| Uuid::new_v4().to_string());
    let interactive = std::io::stdin().is_terminal();
    let mut history: Vec<ChatMessage> = Vec::new();

    pipe.on_startup().await;
    tracing::info!(pipe = pipe.name(), %session, "Chat session started");

    let body = json!({ "session_id": session });
    println!("{}\n", pipe.pipe("", model, &history, &body).await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush().context("Failed to flush stdout")?;
        }

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }

        history.push(ChatMessage::user(message));
        let reply = pipe.pipe(message, model, &history, &body).await;
        println!("{}\n", reply);
        history.push(ChatMessage::assistant(reply));
    }

    pipe.on_shutdown().await;
    Ok(())
}

/// One-shot message
async fn ask(kind: PipeKind, settings: &Settings, message: &str) -> Result<()> {
    let pipe = build_pipe(kind, settings);
    pipe.on_startup().await;

    let history = vec![ChatMessage::user(message)];
    let body = json!({ "session_id": Uuid::new_v4().to_string() });
    let reply = pipe.pipe(message, "firecrawl", &history, &body).await;
    println!("{}", reply);

    pipe.on_shutdown().await;
    Ok(())
}

/// Print resolved configuration
fn show_config() -> Result<()> {
    let settings = Settings::load()?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("  Firecrawl Pipes Configuration");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    print!("{}", settings.describe()?);

    Ok(())
}
