//! Page-Ledger main entry point
//!
//! This is the command-line interface for the Page-Ledger listing crawler.

use clap::Parser;
use page_ledger::config::{load_config_with_hash, Config, PaginationMode, StorageBackend};
use page_ledger::crawler::{crawl, seed_cursor};
use page_ledger::output::{load_statistics, print_statistics};
use page_ledger::storage::open_store;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Page-Ledger: a resumable crawler for paginated, authenticated listings
///
/// Page-Ledger walks a result listing page by page, fetches the detail
/// resource of every listed item and saves one record per item. Interrupted
/// crawls resume from the last completed page.
#[derive(Parser, Debug)]
#[command(name = "page-ledger")]
#[command(version)]
#[command(about = "A resumable crawler for paginated listings", long_about = None)]
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

    /// Write the first listing page as the cursor and exit
    #[arg(long, conflicts_with_all = ["status", "dry_run"])]
    seed: bool,

    /// Show checkpoint progress and exit
    #[arg(long, conflicts_with_all = ["seed", "dry_run"])]
    status: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["seed", "status"])]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.seed {
        handle_seed(&config)?;
    } else if cli.status {
        handle_status(&config)?;
    } else {
        handle_crawl(&config).await?;
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
            0 => EnvFilter::new("page_ledger=info,warn"),
            1 => EnvFilter::new("page_ledger=debug,info"),
            2 => EnvFilter::new("page_ledger=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Page-Ledger Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max parallel requests: {}",
        config.crawler.max_parallel_requests
    );
    println!("  Page size: {}", config.crawler.page_size);
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );
    println!(
        "  Retries: {} (backoff {}ms up to {}ms)",
        config.crawler.max_retries, config.crawler.retry_base_delay_ms, config.crawler.retry_max_delay_ms
    );
    println!(
        "  Item failure policy: {:?}",
        config.crawler.item_failure_policy
    );

    println!("\nSession:");
    println!("  User agent: {}", config.session.user_agent);
    println!(
        "  Cookie: {}",
        if config.session.cookie.is_empty() {
            "(none)"
        } else {
            "(set)"
        }
    );

    println!("\nListing:");
    println!("  URL: {}", config.listing.url);
    match config.listing.pagination {
        PaginationMode::Offset => println!(
            "  Pagination: offset ({} / {})",
            config.listing.offset_param, config.listing.count_param
        ),
        PaginationMode::NextLink => {
            println!("  Pagination: next link ({})", config.markup.next_link)
        }
    }
    println!("  Detail template: {}", config.detail.url_template);

    println!("\nOutput:");
    match config.output.backend {
        StorageBackend::Files => println!("  Directory: {}", config.output.directory),
        StorageBackend::Sqlite => println!("  Database: {}", config.output.database_path),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --seed mode: writes the initial cursor
fn handle_seed(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&config.output)?;

    match seed_cursor(config, store.as_ref())? {
        Some(cursor) => println!("✓ Seeded cursor: {}", cursor),
        None => println!("Store already has a cursor; nothing changed"),
    }

    Ok(())
}

/// Handles the --status mode: shows checkpoint statistics
fn handle_status(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&config.output)?;

    let stats = load_statistics(store.as_ref())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&config.output)?;

    tracing::info!(
        "Crawling with up to {} requests in flight",
        config.crawler.max_parallel_requests
    );

    match crawl(config, store).await {
        Ok(report) => {
            tracing::info!(
                "Crawl completed: {} pages, {} items fetched, {} already saved, {} failed",
                report.pages,
                report.fetched,
                report.skipped,
                report.failed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
