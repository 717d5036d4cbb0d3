//! Course-Archiver main entry point
//!
//! This is the command-line interface for the course website archiver.

use anyhow::Context;
use clap::Parser;
use course_archiver::config::{load_config_with_hash, Config, RendererKind};
use course_archiver::crawler::run_archive;
use course_archiver::output::print_statistics;
use course_archiver::prompt::ask_use_cache;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Course-Archiver: mirror a course website to local disk
///
/// Crawls every page under the course base URL, downloads linked files,
/// and records which archived file came from which URL, plus the code
/// repositories the course links to.
#[derive(Parser, Debug)]
#[command(name = "course-archiver")]
#[command(version)]
#[command(about = "Mirror a course website to local disk", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore the existing mirror and fetch everything again
    #[arg(long, conflicts_with = "prompt")]
    no_cache: bool,

    /// Ask on startup whether to use cached files
    #[arg(long)]
    prompt: bool,

    /// Override the configured page renderer
    #[arg(long, value_enum)]
    renderer: Option<RendererKind>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(renderer) = cli.renderer {
        config.crawler.renderer = renderer;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    if cli.no_cache {
        config.crawler.use_cache = false;
    } else if cli.prompt {
        config.crawler.use_cache = ask_use_cache().context("failed to read answer")?;
    }

    handle_crawl(&config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("course_archiver=info,warn"),
            1 => EnvFilter::new("course_archiver=debug,info"),
            2 => EnvFilter::new("course_archiver=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Course-Archiver Dry Run ===\n");

    println!("Site:");
    println!("  Course: {}", config.site.course);
    println!("  Code host: {}", config.site.git);

    println!("\nCrawler Configuration:");
    println!("  Use cache: {}", config.crawler.use_cache);
    println!("  Renderer: {:?}", config.crawler.renderer);
    println!("  Network idle window: {}ms", config.crawler.network_idle_ms);
    println!(
        "  Navigation timeout: {}s",
        config.crawler.navigation_timeout_secs
    );
    println!(
        "  Max concurrent downloads: {}",
        config.crawler.max_concurrent_downloads
    );
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nOutput:");
    println!("  Mirror: {}", config.output.out_dir);
    println!("  Visited log: {}", config.output.visited_path);
    println!("  Mappings: {}", config.output.mappings_path);
    println!("  Repositories: {}", config.output.repos_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", config.site.course);
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let outcome = run_archive(config).await.context("crawl failed")?;

    println!();
    print_statistics(&outcome.stats);

    if outcome.stats.is_fully_cached() {
        tracing::info!("Mirror was already complete; nothing fetched");
    }

    Ok(())
}
