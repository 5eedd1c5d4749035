//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror mirroring engine.

use clap::Parser;
use site_mirror::config::{load_config_with_hash, validate, DenyEntry, DispatchMode, MirrorConfig};
use site_mirror::crawler::run_mirror;
use site_mirror::output::print_statistics;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: mirror websites through a headless browser
///
/// Site-Mirror renders every page in a real browser, saves each resource the
/// page loads into a directory tree that mirrors the URL structure, and can
/// turn selected parts of every page into Markdown.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version = "1.0.0")]
#[command(about = "Mirror websites through a headless browser", long_about = None)]
struct Cli {
    /// Directory the mirror tree is written into
    #[arg(value_name = "OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Seed URLs to mirror
    #[arg(value_name = "URLS")]
    urls: Vec<String>,

    /// CSS selectors whose content is converted to Markdown (comma separated)
    #[arg(long, value_delimiter = ',')]
    selectors: Vec<String>,

    /// Follow links that live under one of the seed URLs
    #[arg(short, long)]
    recursive: bool,

    /// Write a Markdown file next to every rendered page
    #[arg(long = "generate-markdown", visible_alias = "md")]
    generate_markdown: bool,

    /// Render the pages of a batch one after another
    #[arg(long)]
    serial: bool,

    /// Number of pages rendered per batch
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Block requests matching this URL or wildcard pattern (repeatable)
    #[arg(long = "block", value_name = "PATTERN")]
    block: Vec<String>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and show what would be mirrored without launching a browser
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => MirrorConfig::default(),
    };

    apply_overrides(&mut config, &cli);

    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_mirror(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
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

/// Layers command-line values over the file configuration
fn apply_overrides(config: &mut MirrorConfig, cli: &Cli) {
    if let Some(out_dir) = &cli.out_dir {
        config.output.directory = out_dir.clone();
    }
    if !cli.urls.is_empty() {
        config.crawler.seeds = cli.urls.clone();
    }
    if !cli.selectors.is_empty() {
        config.output.selectors = cli.selectors.clone();
    }
    if cli.recursive {
        config.crawler.recursive = true;
    }
    if cli.generate_markdown {
        config.output.generate_markdown = true;
    }
    if cli.serial {
        config.crawler.dispatch = DispatchMode::Serial;
    }
    if let Some(batch_size) = cli.batch_size {
        config.crawler.batch_size = batch_size;
    }
    config.denylist.extend(cli.block.iter().map(|pattern| DenyEntry {
        pattern: pattern.clone(),
    }));
}

/// Handles the --dry-run mode: shows what would be mirrored
fn handle_dry_run(config: &MirrorConfig) {
    println!("=== Site-Mirror Dry Run ===\n");

    println!("Output:");
    println!("  Directory: {}", config.output.directory.display());
    println!("  Markdown: {}", config.output.generate_markdown);
    if config.output.generate_markdown {
        println!("  Selectors: {}", config.markdown_selectors().join(", "));
    }

    println!("\nCrawler Configuration:");
    println!("  Recursive: {}", config.crawler.recursive);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Dispatch: {:?}", config.crawler.dispatch);
    if config.crawler.max_pages > 0 {
        println!("  Max pages: {}", config.crawler.max_pages);
    }
    println!(
        "  Max failed batches: {}",
        config.crawler.max_failed_batches
    );

    println!("\nBrowser:");
    println!(
        "  Navigation timeout: {}ms",
        config.browser.navigation_timeout_ms
    );
    println!(
        "  Network idle: <= {} in flight for {}ms",
        config.browser.idle_max_in_flight, config.browser.idle_window_ms
    );
    println!(
        "  Viewport: {}x{}",
        config.browser.viewport_width, config.browser.viewport_height
    );
    println!("  Headless: {}", config.browser.headless);

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\nDenylist ({}):", config.denylist.len());
    for entry in &config.denylist {
        println!("  - {}", entry.pattern);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start mirroring with {} seed URLs",
        config.crawler.seeds.len()
    );
}

/// Handles the main mirror operation
async fn handle_mirror(config: MirrorConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Mirroring {} seed(s) into {}",
        config.crawler.seeds.len(),
        config.output.directory.display()
    );

    match run_mirror(config).await {
        Ok(stats) => {
            println!("Done!");
            println!();
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}
