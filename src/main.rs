//! Crawlflow main entry point
//!
//! This is the command-line interface for the crawlflow pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crawlflow::config::{load_job_config_with_hash, load_policies, JobConfig, Policies};
use crawlflow::crawler::run_pipeline;
use crawlflow::output::{load_statistics, print_run_report, print_statistics};
use crawlflow::storage::{open_store, DocumentStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Crawlflow: a sharded, resumable crawl pipeline
///
/// Each `run` takes every pending record through domain extraction,
/// robots.txt admission and fetching, then grows the frontier from the
/// fetched pages for the next run.
#[derive(Parser, Debug)]
#[command(name = "crawlflow")]
#[command(version)]
#[command(about = "A sharded, resumable crawl pipeline", long_about = None)]
struct Cli {
    /// Path to TOML job configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one full pipeline pass over the pending records
    Run,

    /// Insert seed URLs at depth 0
    Seed {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Show record counts by status and exit
    Stats,

    /// Validate the configuration and policies without crawling
    DryRun,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_job_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let base_dir = cli
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let policies = load_policies(&config, &base_dir).context("Failed to load policies")?;

    match cli.command {
        Command::Run => handle_run(&config, &policies, &base_dir).await,
        Command::Seed { urls } => handle_seed(&config, &base_dir, &urls),
        Command::Stats => handle_stats(&config, &base_dir),
        Command::DryRun => {
            handle_dry_run(&config, &policies);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawlflow=info,warn"),
            1 => EnvFilter::new("crawlflow=debug,info"),
            2 => EnvFilter::new("crawlflow=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles `run`: one pipeline pass
async fn handle_run(
    config: &JobConfig,
    policies: &Policies,
    base_dir: &Path,
) -> anyhow::Result<()> {
    let mut report = match run_pipeline(config, policies, base_dir).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            return Err(e.into());
        }
    };

    print_run_report(&report);
    report.wait_for_cleanup().await;
    Ok(())
}

/// Handles `seed`: inserts depth-0 records
fn handle_seed(config: &JobConfig, base_dir: &Path, urls: &[String]) -> anyhow::Result<()> {
    let store = open_store(&base_dir.join(&config.storage.database_path))?;

    let mut inserted = 0;
    for url in urls {
        if ::url::Url::parse(url).is_err() {
            tracing::warn!("Skipping invalid seed URL: {}", url);
            continue;
        }
        if store.insert_seed(url)? {
            inserted += 1;
        } else {
            tracing::info!("Already known: {}", url);
        }
    }

    println!("Seeded {} of {} URL(s)", inserted, urls.len());
    Ok(())
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(config: &JobConfig, base_dir: &Path) -> anyhow::Result<()> {
    let path = base_dir.join(&config.storage.database_path);
    println!("Database: {}\n", path.display());

    let store = open_store(&path)?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles `dry-run`: prints the validated configuration
fn handle_dry_run(config: &JobConfig, policies: &Policies) {
    println!("=== Crawlflow Dry Run ===\n");

    println!("Job:");
    println!("  Name: {}", config.job.name);
    println!("  Shard count: {}", config.job.shard_count);
    println!("  Max shard attempts: {}", config.job.max_shard_attempts);
    println!("  Work dir: {}", config.job.work_dir);
    println!(
        "  Robots sharding: at most {} shards, {} domains per shard",
        config.robots.max_shard_count, config.robots.max_domains_per_shard
    );
    println!("  Database: {}", config.storage.database_path);

    let fetcher = &policies.fetcher;
    println!("\nFetcher Policy:");
    println!("  User agent: {}", fetcher.user_agent());
    println!("  Request timeout: {}ms", fetcher.request_timeout);
    println!("  Crawl delay: {}ms", fetcher.crawl_delay);
    println!(
        "  Redirects: {:?} (max {})",
        fetcher.redirect_mode, fetcher.max_redirects
    );
    println!("  Accept-Language: {}", fetcher.accept_language);
    println!("  Valid mime types: {}", fetcher.valid_mime_types);
    for entry in &fetcher.max_content_size {
        println!("  Max size {}: {} bytes", entry.content_type, entry.size);
    }

    if let Some(score) = &policies.score {
        println!("\nScore Config:");
        println!("  Query: {}", score.score_query);
        println!("  Adopt score: {}", score.adopt_score);
    }

    println!("\nURL Filter: {} entr(y/ies)", policies.url_filter.len());

    println!("\n✓ Configuration is valid");
}
