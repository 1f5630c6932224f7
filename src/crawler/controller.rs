//! Crawl controller - the resumable pagination state machine
//!
//! One page at a time, the controller:
//! - Fetches the listing page named by the cursor
//! - Fetches every item on the page that has no saved record yet, concurrently
//! - Writes each record as soon as its detail arrives
//! - Marks the page complete and only then advances the cursor, writing the
//!   next page index together with it
//!
//! A crash at any point leaves the cursor on a page whose items are partly
//! saved; the rerun skips the saved items and fetches the rest.

use crate::config::ItemFailurePolicy;
use crate::crawler::fetcher::PageFetcher;
use crate::output::{format_eta, progress_line};
use crate::state::{Checkpoint, CrawlPhase, Cursor, ItemKey, ItemRef};
use crate::storage::{CheckpointStore, FailedItem};
use crate::LedgerError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Totals of a controller run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages checkpointed during this run
    pub pages: u64,
    /// Items fetched and saved
    pub fetched: u64,
    /// Items skipped because a record already existed
    pub skipped: u64,
    /// Items given up on under the `skip` policy
    pub failed: u64,
}

impl CrawlReport {
    fn add(&mut self, page: CrawlReport) {
        self.pages += page.pages;
        self.fetched += page.fetched;
        self.skipped += page.skipped;
        self.failed += page.failed;
    }
}

/// Drives a crawl from the persisted cursor to the last listing page
pub struct CrawlController {
    fetcher: Arc<PageFetcher>,
    store: Arc<dyn CheckpointStore>,
    page_size: u32,
    failure_policy: ItemFailurePolicy,
    phase: CrawlPhase,
}

impl CrawlController {
    pub fn new(
        fetcher: Arc<PageFetcher>,
        store: Arc<dyn CheckpointStore>,
        page_size: u32,
        failure_policy: ItemFailurePolicy,
    ) -> Self {
        Self {
            fetcher,
            store,
            page_size,
            failure_policy,
            phase: CrawlPhase::Bootstrapping,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Runs the crawl until the cursor reaches the last page
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Every page has been checkpointed
    /// * `Err(LedgerError::NoCursor)` - The store was never seeded
    /// * `Err(LedgerError::SessionExpired)` - The session cookie must be refreshed
    /// * `Err(LedgerError)` - Any other fatal error; the cursor still names
    ///   the page that was being processed
    pub async fn run(&mut self) -> crate::Result<CrawlReport> {
        match self.drive().await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.transition(CrawlPhase::Aborted);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: CrawlPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
    }

    async fn drive(&mut self) -> crate::Result<CrawlReport> {
        let mut report = CrawlReport::default();

        // ===== Bootstrapping =====
        let Some(checkpoint) = self.store.read_checkpoint()? else {
            return Err(LedgerError::NoCursor);
        };
        let mut url = match checkpoint.cursor {
            Cursor::Done => {
                tracing::info!("Crawl already complete, nothing to do");
                self.transition(CrawlPhase::Done);
                return Ok(report);
            }
            Cursor::Next(url) => url,
        };

        // Cursors written without an index fall back to the marker count
        let mut page_index = match checkpoint.page_index {
            Some(index) => index,
            None => self.store.completed_pages()?,
        };
        tracing::info!("Resuming at page {} ({})", page_index + 1, url);

        // The bootstrap payload doubles as the first page
        let first = self.fetcher.fetch_listing_page(&url).await?;
        let total = self.fetcher.parser().parse_total_count(&first);
        match total {
            Some(total) => tracing::info!("{} results in listing", total),
            None => tracing::warn!("Listing does not state a result count"),
        }
        let mut payload = Some(first);

        loop {
            // ===== FetchingPage =====
            self.transition(CrawlPhase::FetchingPage);
            let html = match payload.take() {
                Some(html) => html,
                None => self.fetcher.fetch_listing_page(&url).await?,
            };

            let current = Url::parse(&url)?;
            let items = self.fetcher.parser().parse_item_list(&html);
            let mut next = self.fetcher.parser().parse_next_page_token(&html, &current);
            if next.as_deref() == Some(url.as_str()) {
                tracing::warn!("Next page of {} points to itself, treating it as the last", url);
                next = None;
            }

            let offset = page_index * u64::from(self.page_size);
            tracing::info!("{}", progress_line(offset, items.len() as u64, total));

            // ===== FetchingItems =====
            self.transition(CrawlPhase::FetchingItems);
            let page = self.fetch_items(items).await?;
            report.add(page);

            // ===== Checkpointing =====
            self.transition(CrawlPhase::Checkpointing);
            self.store.mark_page_complete(page_index)?;
            page_index += 1;
            let cursor = Cursor::after(next);
            self.store
                .write_checkpoint(&Checkpoint::new(cursor.clone(), page_index))?;
            report.pages += 1;

            let done_items = page_index * u64::from(self.page_size);
            let pending = total.map_or(0, |t| t.saturating_sub(done_items)) as usize;
            if let Some(eta) = self.fetcher.dispatcher().estimate_remaining(pending) {
                tracing::info!("Est. time remaining: {}", format_eta(eta));
            }

            match cursor {
                Cursor::Done => {
                    tracing::info!("Reached the last page");
                    self.transition(CrawlPhase::Done);
                    return Ok(report);
                }
                Cursor::Next(next) => url = next,
            }
        }
    }

    /// Fetches and saves every unsaved item of one page
    ///
    /// Waits for every spawned fetch to settle before reporting the first
    /// fatal error.
    async fn fetch_items(&self, items: Vec<ItemRef>) -> crate::Result<CrawlReport> {
        let mut page = CrawlReport::default();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for item in items {
            let key = item.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            if self.store.has_record(&key)? {
                tracing::debug!("Skipping {} (already saved)", key);
                page.skipped += 1;
                continue;
            }
            pending.push((item, key));
        }

        let mut tasks = JoinSet::new();
        for (item, key) in pending {
            let fetcher = Arc::clone(&self.fetcher);
            let store = Arc::clone(&self.store);
            tasks.spawn(async move {
                let result = fetch_and_save(&fetcher, store.as_ref(), &item, &key).await;
                (key, result)
            });
        }

        let mut first_error: Option<LedgerError> = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok((key, Ok(()))) => {
                    tracing::debug!("Saved {}", key);
                    page.fetched += 1;
                    continue;
                }
                Ok((key, Err(e))) => self.settle_failure(key, e),
                Err(e) => Err(e.into()),
            };

            match outcome {
                Ok(()) => page.failed += 1,
                Err(e) => {
                    tracing::error!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(page),
        }
    }

    /// Applies the item-failure policy; Ok means the item was recorded and skipped
    fn settle_failure(&self, key: ItemKey, error: LedgerError) -> crate::Result<()> {
        if self.failure_policy == ItemFailurePolicy::Skip && error.is_item_failure() {
            tracing::warn!("Giving up on {}: {}", key, error);
            self.store
                .record_failure(&FailedItem::new(key, error.to_string()))?;
            return Ok(());
        }
        Err(error)
    }
}

async fn fetch_and_save(
    fetcher: &PageFetcher,
    store: &dyn CheckpointStore,
    item: &ItemRef,
    key: &ItemKey,
) -> crate::Result<()> {
    let html = fetcher.fetch_item_detail(item).await?;
    let record = fetcher.parser().parse_fields(&html);
    if record.is_empty() {
        tracing::warn!("No fields found in detail of {}", key);
    }
    store.write_record(key, &record)?;
    Ok(())
}
