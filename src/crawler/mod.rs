//! Crawler module for listing and detail fetching
//!
//! This module contains the core crawling logic, including:
//! - Bounded-concurrency fetch dispatch with retry and timeouts
//! - Remaining-time estimation from fetch latencies
//! - Markup parsing of listing and detail pages
//! - The resumable pagination state machine

mod controller;
mod dispatcher;
mod estimator;
mod fetcher;
mod parser;
mod transport;

pub use controller::{CrawlController, CrawlReport};
pub use dispatcher::{DispatcherSettings, FetchDispatcher, FetchError, FetchResult, RetryPolicy};
pub use estimator::ThroughputEstimator;
pub use fetcher::PageFetcher;
pub use parser::{MarkupParser, SelectorParser};
pub use transport::{
    build_http_client, ReqwestTransport, Transport, TransportError, TransportResponse,
};

use crate::config::Config;
use crate::state::{Checkpoint, Cursor};
use crate::storage::CheckpointStore;
use crate::url::{initial_listing_url, DetailUrlTemplate};
use std::sync::Arc;
use std::time::Duration;

/// Wires a dispatcher, parser and detail template over `transport`
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `transport` - Transport every fetch goes through
///
/// # Returns
///
/// * `Ok(PageFetcher)` - Ready to fetch
/// * `Err(LedgerError)` - A selector or the detail template is invalid
pub fn build_page_fetcher(
    config: &Config,
    transport: Arc<dyn Transport>,
) -> crate::Result<PageFetcher> {
    let dispatcher = FetchDispatcher::new(transport, DispatcherSettings::from(&config.crawler));
    let parser = SelectorParser::new(&config.markup, &config.listing, config.crawler.page_size)?;
    let detail = DetailUrlTemplate::parse(&config.detail.url_template)?;

    Ok(PageFetcher::new(Arc::new(dispatcher), Arc::new(parser), detail))
}

/// Runs a complete crawl over HTTP
///
/// This is the main entry point for crawling. It will:
/// 1. Build the HTTP client with the session cookie
/// 2. Resume from the cursor in `store`
/// 3. Fetch and save every remaining page and item
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `store` - The checkpoint store to resume from and write to
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed successfully
/// * `Err(LedgerError)` - Crawl failed; rerunning resumes where it stopped
pub async fn crawl(config: &Config, store: Arc<dyn CheckpointStore>) -> crate::Result<CrawlReport> {
    let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
    let transport = Arc::new(ReqwestTransport::new(&config.session, timeout)?);
    let fetcher = build_page_fetcher(config, transport)?;

    let mut controller = CrawlController::new(
        Arc::new(fetcher),
        store,
        config.crawler.page_size,
        config.crawler.item_failure_policy,
    );
    controller.run().await
}

/// Writes the first listing page as the cursor of an unseeded store
///
/// # Returns
///
/// * `Ok(Some(Cursor))` - The cursor that was written
/// * `Ok(None)` - The store already had a cursor; nothing was changed
pub fn seed_cursor(config: &Config, store: &dyn CheckpointStore) -> crate::Result<Option<Cursor>> {
    if let Some(existing) = store.read_cursor()? {
        tracing::info!("Store already seeded, cursor is {}", existing);
        return Ok(None);
    }

    let url = initial_listing_url(&config.listing, config.crawler.page_size)?;
    let cursor = Cursor::Next(url.to_string());
    store.write_checkpoint(&Checkpoint::new(cursor.clone(), 0))?;
    tracing::info!("Seeded cursor {}", cursor);
    Ok(Some(cursor))
}
