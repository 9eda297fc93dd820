use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use interlog::config::{CollectorConfig, TrackingSettings};
use interlog::identity::{HubIdentitySource, IdentityResolver};
use interlog::storage::{FileStore, KeyValueStore, LogStore, MemoryStore};
use interlog::telemetry::events::{EventHub, InteractionEvent};
use interlog::tracking::TrackingController;

#[derive(Parser)]
#[command(name = "interlog", version, about = "Local interaction telemetry collector")]
struct Cli {
    /// Key-value store file (overrides INTERLOG_STORE)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read newline-delimited JSON events from stdin and record them
    Record {
        /// Tracking settings JSON; without it tracking starts disabled
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Print the persisted log
    Dump,
    /// Resolve the current identity once and print it. Lookup diagnostics are
    /// logged to stderr only; a fallback token is still cached in the store.
    Whoami,
}

/// One stdin line: either an event to dispatch or a settings change.
#[derive(Deserialize)]
#[serde(untagged)]
enum DriverLine {
    Event(InteractionEvent),
    Settings { settings: TrackingSettings },
}

// Appends are unsynchronized read-modify-writes; they must never run in
// parallel, so the driver stays on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let cli = Cli::parse();
    let mut config = CollectorConfig::from_env().context("reading INTERLOG_* environment")?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.store_path.clone()));
    let log = LogStore::new(Arc::clone(&kv));
    let source = Arc::new(HubIdentitySource::new(&config));
    let resolver = Arc::new(IdentityResolver::new(source, Arc::clone(&kv)));

    match cli.command {
        Command::Record { settings } => record(settings, resolver, log).await,
        Command::Dump => {
            let entries = log.entries().context("reading interaction log")?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(())
        }
        Command::Whoami => {
            // Inspection only: diagnostics go to a scratch log, not the persisted one.
            let scratch = LogStore::new(Arc::new(MemoryStore::new()));
            let identity = resolver.resolve(&scratch).await;
            println!("{}", identity);
            Ok(())
        }
    }
}

async fn record(
    settings: Option<PathBuf>,
    resolver: Arc<IdentityResolver>,
    log: LogStore,
) -> Result<()> {
    let hub = Arc::new(EventHub::new());
    let mut controller = TrackingController::new(hub.clone(), resolver, log.clone());

    match settings {
        Some(path) => {
            let loaded = TrackingSettings::from_file(&path).map(Some);
            controller.apply_load_result(loaded).await
        }
        None => controller.apply(None).await,
    }

    tracing::info!("Reading events from stdin. Ctrl+D to stop.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<DriverLine>(line) {
            Ok(DriverLine::Event(event)) => {
                let delivered = hub.dispatch(&event);
                tracing::debug!("Dispatched {} to {} listener(s)", event.event_type, delivered);
            }
            Ok(DriverLine::Settings { settings }) => {
                controller.flush().await;
                controller.apply(Some(&settings)).await;
            }
            Err(e) => tracing::warn!("Ignoring unreadable input line: {}", e),
        }
        // Let spawned appends make progress between lines.
        tokio::task::yield_now().await;
    }

    controller.flush().await;
    controller.shutdown();

    let total = log.entries().map(|e| e.len()).unwrap_or(0);
    tracing::info!("Stopped. {} entries in log.", total);
    Ok(())
}
