//! Ghostreel CLI - inspect saved replays outside the host
//!
//! # Commands
//!
//! - `ghostreel dir` - Print the replay directory
//! - `ghostreel list` - List saved replays with their size
//! - `ghostreel info <name>` - Summarize one replay
//! - `ghostreel convert <name> --to <version>` - Rewrite a replay in an older layout
//!
//! The replay directory comes from `ghostreel.toml` unless `--dir` is given.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};

use ghostreel_core::replay::{
    FORMAT_VERSION, REPLAY_EXTENSION, ReplayFile, ReplayStore, WorldEventKind,
};
use ghostreel_core::{ReplayConfig, config};

/// Ghostreel CLI - inspect saved replays
#[derive(Parser)]
#[command(name = "ghostreel")]
#[command(about = "Inspect and manage saved ghostreel replays")]
#[command(version)]
struct Cli {
    /// Replay directory (defaults to the configured one)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the replay directory
    Dir,

    /// List saved replays
    List,

    /// Show a summary of one replay
    Info {
        /// Replay name, with or without the extension
        name: String,
    },

    /// Rewrite a replay in an older format version
    Convert {
        /// Replay name, with or without the extension
        name: String,

        /// Target format version (1 or 2)
        #[arg(long)]
        to: i32,

        /// Name of the converted replay (defaults to `<name>_v<to>`)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = open_store(cli.dir)?;
    tracing::debug!(dir = %store.dir().display(), "using replay directory");

    match cli.command {
        Commands::Dir => {
            println!("{}", store.dir().display());
            Ok(())
        }
        Commands::List => list(&store),
        Commands::Info { name } => info(&store, &name),
        Commands::Convert { name, to, output } => convert(&store, &name, to, output),
    }
}

fn open_store(dir: Option<PathBuf>) -> Result<ReplayStore> {
    if let Some(dir) = dir {
        return Ok(ReplayStore::new(dir));
    }
    let settings: ReplayConfig = config::load();
    let dir = settings
        .replay_dir()
        .context("Could not determine the replay directory; pass --dir")?;
    Ok(ReplayStore::new(dir))
}

fn list(store: &ReplayStore) -> Result<()> {
    let entries = store
        .list()
        .with_context(|| format!("Failed to list {}", store.dir().display()))?;

    if entries.is_empty() {
        println!("No replay files found in {}", store.dir().display());
        return Ok(());
    }

    println!("Replay files ({}):", entries.len());
    for entry in &entries {
        println!("  {} ({}KB)", entry.name, entry.size_kb());
    }
    Ok(())
}

fn info(store: &ReplayStore, name: &str) -> Result<()> {
    let replay = store
        .load(name)
        .with_context(|| format!("Failed to load replay: {name}"))?;

    println!("=== {name} ===");
    println!("Version: {}", replay.version);
    println!("Created: {}", created(&replay));
    println!("Duration: {:.1}s", replay.duration);
    println!("Frames: {}", replay.frames.len());
    println!("Entity snapshots: {}", replay.snapshot_count());
    println!("Triggers: {}", replay.triggers.len());

    if replay.has_world_events() {
        println!();
        println!("World events: {}", replay.world_events.len());
        for kind in [
            WorldEventKind::Created,
            WorldEventKind::Destroyed,
            WorldEventKind::StateChanged,
        ] {
            println!("  {}: {}", kind.label(), replay.world_event_count(kind));
        }
    }
    Ok(())
}

fn convert(store: &ReplayStore, name: &str, to: i32, output: Option<String>) -> Result<()> {
    if !(1..FORMAT_VERSION).contains(&to) {
        anyhow::bail!("--to must be between 1 and {}", FORMAT_VERSION - 1);
    }

    let replay = store
        .load(name)
        .with_context(|| format!("Failed to load replay: {name}"))?;
    let suffix = format!(".{REPLAY_EXTENSION}");
    let stem = name.strip_suffix(suffix.as_str()).unwrap_or(name);
    let output = output.unwrap_or_else(|| format!("{stem}_v{to}"));

    let path = store
        .save_version(&output, &replay, to)
        .with_context(|| format!("Failed to write replay: {output}"))?;

    println!("Wrote {} (v{to})", path.display());
    Ok(())
}

fn created(replay: &ReplayFile) -> String {
    match DateTime::from_timestamp(replay.timestamp, 0) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => format!("invalid timestamp {}", replay.timestamp),
    }
}
