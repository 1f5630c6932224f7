//! Listing and detail retrieval
//!
//! This module handles:
//! - Fetching listing pages and item detail resources through the dispatcher
//! - Building detail URLs from the configured template
//! - Detecting an expired session (a login page served in place of content)

use crate::crawler::dispatcher::FetchDispatcher;
use crate::crawler::parser::MarkupParser;
use crate::state::ItemRef;
use crate::url::DetailUrlTemplate;
use crate::LedgerError;
use std::sync::Arc;

/// Retrieves listing pages and item details
pub struct PageFetcher {
    dispatcher: Arc<FetchDispatcher>,
    parser: Arc<dyn MarkupParser>,
    detail: DetailUrlTemplate,
}

impl PageFetcher {
    pub fn new(
        dispatcher: Arc<FetchDispatcher>,
        parser: Arc<dyn MarkupParser>,
        detail: DetailUrlTemplate,
    ) -> Self {
        Self {
            dispatcher,
            parser,
            detail,
        }
    }

    pub fn dispatcher(&self) -> &FetchDispatcher {
        &self.dispatcher
    }

    pub fn parser(&self) -> &dyn MarkupParser {
        self.parser.as_ref()
    }

    /// Fetches the raw payload of a listing page
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The page markup
    /// * `Err(LedgerError::SessionExpired)` - The server answered with a login page
    /// * `Err(LedgerError::Fetch)` - The fetch failed permanently
    pub async fn fetch_listing_page(&self, url: &str) -> crate::Result<String> {
        tracing::debug!("Fetching listing page {}", url);
        self.fetch_checked(url).await
    }

    /// Fetches the raw payload of an item's detail resource
    pub async fn fetch_item_detail(&self, item: &ItemRef) -> crate::Result<String> {
        let url = self.detail_url(item);
        tracing::debug!("Fetching detail for {} from {}", item.key(), url);
        self.fetch_checked(&url).await
    }

    /// Detail URL of an item
    pub fn detail_url(&self, item: &ItemRef) -> String {
        self.detail.build(item)
    }

    async fn fetch_checked(&self, url: &str) -> crate::Result<String> {
        let result = self.dispatcher.submit(url).await?;

        if self.parser.is_session_expired(&result.body) {
            tracing::error!("Session expired: {} returned a login page", url);
            return Err(LedgerError::SessionExpired {
                url: url.to_string(),
            });
        }

        Ok(result.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ListingConfig, MarkupConfig, PaginationMode};
    use crate::crawler::dispatcher::{DispatcherSettings, FetchError, RetryPolicy};
    use crate::crawler::parser::SelectorParser;
    use crate::crawler::transport::{Transport, TransportError, TransportResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves fixed bodies by URL and remembers what was requested
    struct MapTransport {
        pages: HashMap<String, TransportResponse>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for MapTransport {
        async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(self
                .pages
                .get(url)
                .cloned()
                .unwrap_or_else(|| TransportResponse::new(404, "not found")))
        }
    }

    fn fetcher(pages: Vec<(&str, u16, &str)>) -> (PageFetcher, Arc<MapTransport>) {
        let transport = Arc::new(MapTransport {
            pages: pages
                .into_iter()
                .map(|(url, status, body)| (url.to_string(), TransportResponse::new(status, body)))
                .collect(),
            requested: Mutex::new(Vec::new()),
        });

        let settings = DispatcherSettings {
            retry: RetryPolicy {
                max_retries: 1,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            },
            ..DispatcherSettings::default()
        };
        let dispatcher = Arc::new(FetchDispatcher::new(transport.clone(), settings));

        let listing = ListingConfig {
            url: "https://example.com/search".to_string(),
            pagination: PaginationMode::NextLink,
            offset_param: "fh".to_string(),
            count_param: "count".to_string(),
        };
        let parser = SelectorParser::new(&MarkupConfig::default(), &listing, 50).unwrap();
        let template = DetailUrlTemplate::parse(
            "https://example.com/detail?recid={record_id}&h={page_id}&db={db_id}",
        )
        .unwrap();

        (
            PageFetcher::new(dispatcher, Arc::new(parser), template),
            transport,
        )
    }

    const LOGIN: &str = r#"<html><body><form id="signInForm"></form></body></html>"#;

    #[tokio::test]
    async fn test_fetch_listing_page() {
        let (fetcher, _) = fetcher(vec![("https://example.com/search", 200, "<p>rows</p>")]);
        let body = fetcher
            .fetch_listing_page("https://example.com/search")
            .await
            .unwrap();
        assert_eq!(body, "<p>rows</p>");
    }

    #[tokio::test]
    async fn test_listing_session_expired() {
        let (fetcher, _) = fetcher(vec![("https://example.com/search", 200, LOGIN)]);
        let result = fetcher.fetch_listing_page("https://example.com/search").await;
        match result {
            Err(LedgerError::SessionExpired { url }) => {
                assert_eq!(url, "https://example.com/search")
            }
            other => panic!("expected SessionExpired, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_item_detail_builds_url() {
        let (fetcher, transport) = fetcher(vec![(
            "https://example.com/detail?recid=7&h=42&db=census",
            200,
            "<p>detail</p>",
        )]);
        let item = ItemRef::new("7", "42", "census");

        let body = fetcher.fetch_item_detail(&item).await.unwrap();
        assert_eq!(body, "<p>detail</p>");
        assert_eq!(
            transport.requested.lock().unwrap().as_slice(),
            ["https://example.com/detail?recid=7&h=42&db=census"]
        );
    }

    #[tokio::test]
    async fn test_detail_session_expired() {
        let (fetcher, _) = fetcher(vec![(
            "https://example.com/detail?recid=1&h=2&db=3",
            200,
            LOGIN,
        )]);
        let result = fetcher.fetch_item_detail(&ItemRef::new("1", "2", "3")).await;
        assert!(matches!(result, Err(LedgerError::SessionExpired { .. })));
    }

    #[tokio::test]
    async fn test_missing_detail_is_client_error() {
        let (fetcher, transport) = fetcher(vec![]);
        let result = fetcher.fetch_item_detail(&ItemRef::new("1", "2", "3")).await;

        assert!(matches!(
            result,
            Err(LedgerError::Fetch(FetchError::ClientError { status: 404, .. }))
        ));
        assert_eq!(transport.requested.lock().unwrap().len(), 1);
    }
}
