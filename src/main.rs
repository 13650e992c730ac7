//! ContextSync host bridge
//!
//! Spawned by the editor extension. Reads one JSON command per line on
//! stdin and writes panel events and replies, one JSON object per line, on
//! stdout. Logs go to stderr.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

use contextsync_lib::{event_channel, telemetry, Bridge, BridgeOutput, HttpBackend, Settings};

#[derive(Parser)]
#[command(name = "contextsync-host")]
#[command(about = "ContextSync editor bridge (JSON lines over stdio)", long_about = None)]
struct Args {
    /// Engine base URL, overrides settings and environment
    #[arg(long)]
    api_base_url: Option<String>,
    /// Settings file (default: <config dir>/contextsync/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn load_settings(args: &Args) -> anyhow::Result<Settings> {
    let settings = match &args.settings {
        Some(path) => Settings::load_from(path)?.with_env_overrides()?,
        None => Settings::load()?,
    };
    match &args.api_base_url {
        Some(url) => Ok(settings.with_api_base_url(url)?),
        None => Ok(settings),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let args = Args::parse();
    let settings = load_settings(&args).context("Failed to load settings")?;
    info!(api = %settings.api_base_url, code_lens = settings.enable_code_lens, "Starting host bridge");

    let backend = Arc::new(HttpBackend::new(&settings));
    let (events, mut event_rx) = event_channel();
    let (replies, mut reply_rx) = mpsc::unbounded_channel();
    let bridge = Bridge::new(backend, &settings, events, replies);

    // ============ WRITER ============

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        loop {
            let output = tokio::select! {
                Some(event) = event_rx.recv() => BridgeOutput::Panel(event),
                Some(reply) = reply_rx.recv() => BridgeOutput::Reply(reply),
                else => break,
            };
            let mut line = match serde_json::to_string(&output) {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "Failed to encode output");
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                error!(error = %e, "Host closed stdout");
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    // ============ READER ============

    if let Err(e) = bridge.serve(BufReader::new(tokio::io::stdin())).await {
        error!(error = %e, "Failed to read stdin");
    }

    // in-flight requests still hold senders; the writer drains until they finish
    info!("Host closed stdin, shutting down");
    drop(bridge);
    let _ = writer.await;
    Ok(())
}
