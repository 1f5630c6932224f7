//! URL handling module for Page-Ledger
//!
//! This module provides query-parameter rewriting for offset pagination and the
//! detail URL template.

mod template;

use crate::config::{ListingConfig, PaginationMode};
use crate::{UrlError, UrlResult};
use url::Url;

pub use template::DetailUrlTemplate;

/// Returns the first value of a query parameter
pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Returns a copy of `url` with `key` set to `value`
///
/// An existing parameter keeps its position; otherwise it is appended.
/// Duplicate occurrences of `key` are collapsed into one.
///
/// # Examples
///
/// ```
/// use page_ledger::url::with_query_param;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/search?fh=0&count=50").unwrap();
/// let next = with_query_param(&url, "fh", "50");
/// assert_eq!(next.as_str(), "https://example.com/search?fh=50&count=50");
/// ```
pub fn with_query_param(url: &Url, key: &str, value: &str) -> Url {
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (k, v) in url.query_pairs() {
        if k == key {
            if !replaced {
                pairs.push((k.into_owned(), value.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((k.into_owned(), v.into_owned()));
        }
    }
    if !replaced {
        pairs.push((key.to_string(), value.to_string()));
    }

    let mut out = url.clone();
    out.query_pairs_mut().clear().extend_pairs(pairs);
    out
}

/// Returns the item offset encoded in a listing URL, if any
pub fn offset_of(url: &Url, offset_param: &str) -> Option<u64> {
    query_param(url, offset_param).and_then(|v| v.parse().ok())
}

/// Builds the URL of the first listing page
///
/// With offset pagination the offset is reset to zero and the page size is
/// written into the count parameter; next-link listings are used as given.
pub fn initial_listing_url(listing: &ListingConfig, page_size: u32) -> UrlResult<Url> {
    let url = Url::parse(&listing.url).map_err(|e| UrlError::Parse(e.to_string()))?;

    match listing.pagination {
        PaginationMode::Offset => {
            let url = with_query_param(&url, &listing.count_param, &page_size.to_string());
            Ok(with_query_param(&url, &listing.offset_param, "0"))
        }
        PaginationMode::NextLink => Ok(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(pagination: PaginationMode) -> ListingConfig {
        ListingConfig {
            url: "https://search.example.com/search?db=census&count=10".to_string(),
            pagination,
            offset_param: "fh".to_string(),
            count_param: "count".to_string(),
        }
    }

    #[test]
    fn test_query_param() {
        let url = Url::parse("https://example.com/?a=1&b=two").unwrap();
        assert_eq!(query_param(&url, "b"), Some("two".to_string()));
        assert_eq!(query_param(&url, "c"), None);
    }

    #[test]
    fn test_with_query_param_appends() {
        let url = Url::parse("https://example.com/search?db=census").unwrap();
        let url = with_query_param(&url, "fh", "100");
        assert_eq!(url.as_str(), "https://example.com/search?db=census&fh=100");
    }

    #[test]
    fn test_with_query_param_collapses_duplicates() {
        let url = Url::parse("https://example.com/?fh=1&x=y&fh=2").unwrap();
        let url = with_query_param(&url, "fh", "3");
        assert_eq!(url.as_str(), "https://example.com/?fh=3&x=y");
    }

    #[test]
    fn test_offset_of() {
        let url = Url::parse("https://example.com/?fh=150").unwrap();
        assert_eq!(offset_of(&url, "fh"), Some(150));
        assert_eq!(offset_of(&url, "offset"), None);

        let url = Url::parse("https://example.com/?fh=abc").unwrap();
        assert_eq!(offset_of(&url, "fh"), None);
    }

    #[test]
    fn test_initial_listing_url_offset_mode() {
        let url = initial_listing_url(&listing(PaginationMode::Offset), 50).unwrap();
        assert_eq!(
            url.as_str(),
            "https://search.example.com/search?db=census&count=50&fh=0"
        );
    }

    #[test]
    fn test_initial_listing_url_next_link_mode() {
        let url = initial_listing_url(&listing(PaginationMode::NextLink), 50).unwrap();
        assert_eq!(
            url.as_str(),
            "https://search.example.com/search?db=census&count=10"
        );
    }
}
