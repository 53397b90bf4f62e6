//! Panel-Mirror main entry point
//!
//! This is the command-line interface for the Panel-Mirror comic downloader.

use clap::Parser;
use panel_mirror::config::{load_config_with_hash, validate, Config};
use panel_mirror::crawler::Coordinator;
use panel_mirror::output::print_report;
use panel_mirror::MirrorError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Panel-Mirror: a local mirror for paginated web comics
///
/// Panel-Mirror reads a series landing page, walks every chapter in the
/// requested range page by page, and saves the page images either one file
/// per page or stitched into one tall image per chapter.
#[derive(Parser, Debug)]
#[command(name = "panel-mirror")]
#[command(version)]
#[command(about = "A local mirror for paginated web comics", long_about = None)]
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

    /// First chapter to download (1-based), overrides the config
    #[arg(long)]
    begin: Option<i64>,

    /// Last chapter to download, -1 for the last one; overrides the config
    #[arg(long, allow_hyphen_values = true)]
    end: Option<i64>,

    /// Maximum chapters walked at once, overrides the config
    #[arg(long)]
    max_concurrency: Option<u32>,

    /// Save every page as its own file instead of stitching chapters
    #[arg(long)]
    no_merge: bool,

    /// Show what would be downloaded without downloading
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(begin) = self.begin {
            config.crawl.begin = begin;
        }
        if let Some(end) = self.end {
            config.crawl.end = end;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            config.crawl.max_concurrency = max_concurrency;
        }
        if self.no_merge {
            config.crawl.merge_images = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Overrides can produce an invalid range or concurrency, so check again
    cli.apply_overrides(&mut config);
    if let Err(e) = validate(&config) {
        tracing::error!("Invalid command-line override: {}", e);
        return Err(e.into());
    }

    if cli.dry_run {
        handle_dry_run(config).await?;
    } else {
        handle_crawl(config).await?;
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
            0 => EnvFilter::new("panel_mirror=info,warn"),
            1 => EnvFilter::new("panel_mirror=debug,info"),
            2 => EnvFilter::new("panel_mirror=trace,debug"),
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

/// Handles the --dry-run mode: reads the index and lists the chapters
async fn handle_dry_run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Panel-Mirror Dry Run ===\n");

    println!("Site:");
    println!("  Landing page: {}", config.site.landing_url);
    println!("  Content page suffix: {}", config.site.content_page_suffix);

    println!("\nCrawl:");
    println!("  Range: {} to {}", config.crawl.begin, describe_end(config.crawl.end));
    println!("  Max concurrent chapters: {}", config.crawl.max_concurrency);
    println!(
        "  Mode: {}",
        if config.crawl.merge_images {
            "one stitched image per chapter"
        } else {
            "one file per page"
        }
    );
    println!("  Failure policy: {:?}", config.crawl.failure_policy);

    println!("\nOutput:");
    println!("  Download path: {}", config.output.download_path);
    println!("  JPEG quality: {}", config.output.jpeg_quality);

    let coordinator = Coordinator::new(config)?;
    let plan = coordinator.plan().await?;

    println!(
        "\nSeries: {} ({} chapters listed)",
        plan.series_title, plan.total_chapters
    );
    println!("Would download {} chapters:", plan.selected.len());
    for chapter in &plan.selected {
        println!("  #{} {} - {}", chapter.position, chapter.name, chapter.start_url);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

fn describe_end(end: i64) -> String {
    if end == -1 {
        "last".to_string()
    } else {
        end.to_string()
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Mirroring {} (chapters {} to {}, {} at a time)",
        config.site.landing_url,
        config.crawl.begin,
        describe_end(config.crawl.end),
        config.crawl.max_concurrency
    );

    let coordinator = Coordinator::new(config)?;
    let report = match coordinator.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_report(&report);

    if !report.failed.is_empty() {
        let err = MirrorError::Incomplete {
            failed: report.failed.len(),
            total: report.chapters_selected,
        };
        tracing::error!("Crawl incomplete: {}", err);
        return Err(err.into());
    }

    tracing::info!("Crawl completed successfully");
    Ok(())
}
