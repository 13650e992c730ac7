//! ContextSync CLI
//!
//! Talks to the context engine directly, without an editor. Useful for
//! checking what the code lenses and the panel would show for a file.
//! Every command prints one JSON document on stdout.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use contextsync_lib::backend::protocol::{ChatRequest, SelectionRequest, StatsRequest, SyncOutcome};
use contextsync_lib::{
    annotate, annotate_batch, extract_snippets, group, telemetry, Annotation, ContextBackend,
    ContextGroup, ContextRecord, DocumentSymbol, HttpBackend, IndexedAnnotation, LineRange,
    Settings, StatsRecord,
};

#[derive(Parser)]
#[command(name = "contextsync")]
#[command(about = "ContextSync CLI - Slack/Jira context for code", long_about = None)]
struct Cli {
    /// Engine base URL, overrides settings and environment
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discussion counts and code-lens labels
    Stats {
        #[command(subcommand)]
        action: StatsAction,
    },
    /// Explain the intent of a line range
    Explain {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Related Slack/Jira/Confluence/Notion records for a line range
    Context {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Ask a question about some context
    Chat {
        message: String,
        /// Grounding context text
        #[arg(short, long, default_value = "")]
        context: String,
    },
    /// Pull fresh Slack/Jira data into the engine
    Sync,
}

#[derive(Subcommand)]
enum StatsAction {
    /// Annotate a file given its document symbols (JSON array)
    File {
        path: PathBuf,
        #[arg(short, long)]
        symbols: PathBuf,
        /// Lines per snippet (default: from settings)
        #[arg(long)]
        max_lines: Option<u32>,
    },
    /// Counts for literal snippets
    Snippets {
        #[arg(required = true)]
        snippets: Vec<String>,
    },
}

#[derive(clap::Args)]
struct SelectionArgs {
    /// Source file
    path: PathBuf,
    /// 1-based inclusive range, e.g. 10-20 or 7
    #[arg(short, long)]
    lines: String,
}

// ============ Output Types ============

#[derive(Serialize)]
struct SnippetStatsOutput {
    snippet: String,
    stats: StatsRecord,
    annotation: Option<Annotation>,
}

#[derive(Serialize)]
struct FileStatsOutput {
    snippets: usize,
    annotations: Vec<IndexedAnnotation>,
}

#[derive(Serialize)]
struct ExplainOutput {
    markdown: String,
}

#[derive(Serialize)]
struct ContextOutput {
    total: usize,
    groups: Vec<ContextGroup>,
}

#[derive(Serialize)]
struct ChatOutput {
    reply: String,
}

#[derive(Serialize)]
struct SyncOutput {
    status: Option<String>,
    items_synced: Option<u64>,
    message: Option<String>,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

type CliResult = Result<String, Box<dyn std::error::Error>>;

// ============ Main ============

#[tokio::main]
async fn main() {
    telemetry::init();
    let cli = Cli::parse();

    let result = match load_settings(cli.api_base_url.as_deref()) {
        Ok(settings) => run(cli.command, &settings).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            let error = ErrorOutput { error: e.to_string() };
            println!("{}", serde_json::to_string(&error).unwrap_or_default());
            std::process::exit(1);
        }
    }
}

fn load_settings(api_base_url: Option<&str>) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    match api_base_url {
        Some(url) => Ok(settings.with_api_base_url(url)?),
        None => Ok(settings),
    }
}

async fn run(command: Commands, settings: &Settings) -> CliResult {
    let backend = HttpBackend::new(settings);
    match command {
        Commands::Stats { action } => handle_stats(&backend, action, settings).await,
        Commands::Explain { selection } => {
            let request = selection_request(&selection)?;
            let reply = backend.explain(request).await?;
            Ok(serde_json::to_string(&ExplainOutput { markdown: reply.markdown })?)
        }
        Commands::Context { selection } => {
            let request = selection_request(&selection)?;
            let objects = backend.retrieve(request).await?;
            let total = objects.len();
            let groups = group(objects.into_iter().map(ContextRecord::from));
            Ok(serde_json::to_string(&ContextOutput { total, groups })?)
        }
        Commands::Chat { message, context } => {
            let request = ChatRequest { message, history: Vec::new(), context };
            let reply = backend.chat(request).await?;
            Ok(serde_json::to_string(&ChatOutput { reply: reply.reply })?)
        }
        Commands::Sync => {
            let reply = backend.sync().await?;
            if let SyncOutcome::Failed(message) = reply.outcome() {
                return Err(format!("Sync failed: {}", message).into());
            }
            Ok(serde_json::to_string(&SyncOutput {
                status: reply.status,
                items_synced: reply.items_synced,
                message: reply.message,
            })?)
        }
    }
}

// ============ Handlers ============

async fn handle_stats(backend: &HttpBackend, action: StatsAction, settings: &Settings) -> CliResult {
    match action {
        StatsAction::File { path, symbols, max_lines } => {
            let text = fs::read_to_string(&path)?;
            let symbols: Vec<DocumentSymbol> = serde_json::from_str(&fs::read_to_string(&symbols)?)?;
            let batch = extract_snippets(&text, &symbols, max_lines.unwrap_or(settings.snippet_max_lines));

            let annotations = if batch.is_empty() {
                Vec::new()
            } else {
                let stats = backend.stats(StatsRequest { snippets: batch.texts() }).await?;
                annotate_batch(&batch, &stats)
            };
            Ok(serde_json::to_string(&FileStatsOutput { snippets: batch.len(), annotations })?)
        }
        StatsAction::Snippets { snippets } => {
            let stats = backend.stats(StatsRequest { snippets: snippets.clone() }).await?;
            let items: Vec<SnippetStatsOutput> = snippets
                .into_iter()
                .zip(stats)
                .map(|(snippet, stats)| SnippetStatsOutput {
                    snippet,
                    stats,
                    annotation: annotate(&stats),
                })
                .collect();
            Ok(serde_json::to_string(&items)?)
        }
    }
}

fn selection_request(selection: &SelectionArgs) -> Result<SelectionRequest, Box<dyn std::error::Error>> {
    let lines = parse_lines(&selection.lines)?;
    let snippet = read_lines(&selection.path, lines)?;
    Ok(SelectionRequest::new(&snippet, &selection.path.to_string_lossy(), lines))
}

fn parse_lines(raw: &str) -> Result<LineRange, String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("Invalid line range: {}", raw))
    };
    match raw.split_once('-') {
        Some((start, end)) => Ok(LineRange::new(parse(start)?, parse(end)?)),
        None => {
            let line = parse(raw)?;
            Ok(LineRange::new(line, line))
        }
    }
}

fn read_lines(path: &Path, lines: LineRange) -> Result<String, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let selected: Vec<&str> = text
        .lines()
        .skip(lines.start as usize - 1)
        .take((lines.end - lines.start + 1) as usize)
        .collect();
    if selected.is_empty() {
        return Err(format!("{} has no lines {}", path.display(), lines).into());
    }
    Ok(selected.join("\n"))
}
