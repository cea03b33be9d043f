//! Clipstream main entry point
//!
//! Small command-line front end for the feed pipeline: resolves one page-fill
//! cycle for a source and prints the playable clips it found.

use anyhow::Context;
use clap::Parser;
use clipstream::settings::{MemorySettingsStore, Settings, SettingsStore, SqliteSettingsStore};
use clipstream::{build_http_client, FeedConfig, FeedOrchestrator};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Clipstream: a quality-filtered short-video feed
#[derive(Parser, Debug)]
#[command(name = "clipstream")]
#[command(about = "Fetch a feed of playable video clips from a subreddit", long_about = None)]
struct Cli {
    /// Subreddit to read, e.g. "gifs"
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Listing sort order (hot, new, top, rising)
    #[arg(short, long, default_value = "hot")]
    sort: String,

    /// Number of playable clips to collect
    #[arg(short = 'n', long, default_value_t = 10)]
    count: u32,

    /// Path to the settings database (defaults to in-memory)
    #[arg(long, value_name = "PATH")]
    settings_db: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let store: Box<dyn SettingsStore + Send> = match &cli.settings_db {
        Some(path) => Box::new(
            SqliteSettingsStore::new(path)
                .with_context(|| format!("failed to open settings db at {}", path.display()))?,
        ),
        None => Box::new(MemorySettingsStore::new()),
    };

    let http = build_http_client().context("failed to build HTTP client")?;
    let orchestrator = FeedOrchestrator::with_config(http, store, FeedConfig::default())
        .context("failed to create orchestrator")?;

    orchestrator.init().context("failed to load settings")?;
    orchestrator.set_settings(Settings {
        sort: cli.sort.parse()?,
        per_page: cli.count,
    })?;

    let mut loading = orchestrator.loading();
    let feed = orchestrator.feed();

    orchestrator.set_source(&cli.source);

    // Wait for the initial fill cycle to finish; loading only ever returns to
    // false once the cycle stops, whatever happened upstream.
    loop {
        loading
            .changed()
            .await
            .context("orchestrator went away mid-cycle")?;
        if !*loading.borrow() {
            break;
        }
    }

    let clips = feed.borrow().clone();
    if clips.is_empty() {
        println!("No playable clips found in r/{}", cli.source);
        return Ok(());
    }

    println!("r/{} ({} clips):\n", cli.source, clips.len());
    for (index, clip) in clips.iter().enumerate() {
        println!("{:>3}. {}", index + 1, clip.title);
        println!("     by u/{} | {} comments", clip.author, clip.comments);
        if let Some(src) = &clip.src {
            println!("     {}", src);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("clipstream=info,warn"),
            1 => EnvFilter::new("clipstream=debug,info"),
            2 => EnvFilter::new("clipstream=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
