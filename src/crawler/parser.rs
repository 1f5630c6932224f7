//! HTML parser for listing pages and detail resources
//!
//! This module handles parsing markup to extract:
//! - The total number of results on a listing
//! - The items listed on a page
//! - The location of the next listing page
//! - The session-expired marker
//! - Field/value pairs from a detail resource

use crate::config::{compile_selector, ListingConfig, MarkupConfig, PaginationMode};
use crate::state::{FieldValue, ItemRef, Record};
use crate::url::{offset_of, with_query_param};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extraction of structured data from listing and detail markup
pub trait MarkupParser: Send + Sync {
    /// Total number of results on the listing, if the page states it
    fn parse_total_count(&self, html: &str) -> Option<u64>;

    /// Items listed on a page, in document order
    fn parse_item_list(&self, html: &str) -> Vec<ItemRef>;

    /// Absolute URL of the next listing page, or None on the last page
    fn parse_next_page_token(&self, html: &str, current: &Url) -> Option<String>;

    /// True if the payload is a login page rather than the expected content
    fn is_session_expired(&self, html: &str) -> bool;

    /// Field/value pairs of a detail resource
    fn parse_fields(&self, html: &str) -> Record;
}

/// How [`SelectorParser`] finds the next listing page
#[derive(Debug, Clone)]
enum Pagination {
    Offset {
        offset_param: String,
        count_param: String,
        page_size: u64,
    },
    NextLink(Selector),
}

/// [`MarkupParser`] driven by configurable CSS selectors
#[derive(Debug, Clone)]
pub struct SelectorParser {
    total_count: Selector,
    item_row: Selector,
    record_id_attr: String,
    page_id_attr: String,
    db_id_attr: String,
    session_expired: Selector,
    field_row: Selector,
    multi_value: Selector,
    cell: Selector,
    pagination: Pagination,
}

impl SelectorParser {
    /// Compiles every selector of the markup configuration
    pub fn new(
        markup: &MarkupConfig,
        listing: &ListingConfig,
        page_size: u32,
    ) -> Result<Self, ConfigError> {
        let pagination = match listing.pagination {
            PaginationMode::Offset => Pagination::Offset {
                offset_param: listing.offset_param.clone(),
                count_param: listing.count_param.clone(),
                page_size: u64::from(page_size),
            },
            PaginationMode::NextLink => {
                Pagination::NextLink(compile_selector("next-link", &markup.next_link)?)
            }
        };

        Ok(Self {
            total_count: compile_selector("total-count", &markup.total_count)?,
            item_row: compile_selector("item-row", &markup.item_row)?,
            record_id_attr: markup.record_id_attr.clone(),
            page_id_attr: markup.page_id_attr.clone(),
            db_id_attr: markup.db_id_attr.clone(),
            session_expired: compile_selector("session-expired", &markup.session_expired)?,
            field_row: compile_selector("field-row", &markup.field_row)?,
            multi_value: compile_selector("multi-value", &markup.multi_value)?,
            cell: compile_selector("cell", "td")?,
            pagination,
        })
    }

    fn parse_item(&self, row: ElementRef<'_>) -> Option<ItemRef> {
        let attr = |name: &str| {
            row.value()
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        Some(ItemRef::new(
            attr(&self.record_id_attr)?,
            attr(&self.page_id_attr)?,
            attr(&self.db_id_attr)?,
        ))
    }

    fn offset_next(
        &self,
        html: &str,
        current: &Url,
        offset_param: &str,
        count_param: &str,
        page_size: u64,
    ) -> Option<String> {
        let offset = offset_of(current, offset_param).unwrap_or(0);
        let next = offset + page_size;

        let has_more = match self.parse_total_count(html) {
            Some(total) => next < total,
            // Without a stated total, a full page means there may be more
            None => self.parse_item_list(html).len() as u64 >= page_size,
        };
        if !has_more {
            return None;
        }

        let url = with_query_param(current, count_param, &page_size.to_string());
        Some(with_query_param(&url, offset_param, &next.to_string()).to_string())
    }
}

impl MarkupParser for SelectorParser {
    fn parse_total_count(&self, html: &str) -> Option<u64> {
        let document = Html::parse_document(html);
        let header = document.select(&self.total_count).next()?;
        let text = element_text(header);

        // "Results 1-50 of 12,345" -> "12,345"
        let tail = text.rsplit(" of ").next().unwrap_or(text.as_str());
        let digits: String = tail
            .trim()
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == ',')
            .filter(|c| *c != ',')
            .collect();

        digits.parse().ok()
    }

    fn parse_item_list(&self, html: &str) -> Vec<ItemRef> {
        let document = Html::parse_document(html);
        document
            .select(&self.item_row)
            .filter_map(|row| {
                let item = self.parse_item(row);
                if item.is_none() {
                    tracing::debug!("Skipping listing row without item identifiers");
                }
                item
            })
            .collect()
    }

    fn parse_next_page_token(&self, html: &str, current: &Url) -> Option<String> {
        match &self.pagination {
            Pagination::Offset {
                offset_param,
                count_param,
                page_size,
            } => self.offset_next(html, current, offset_param, count_param, *page_size),
            Pagination::NextLink(selector) => {
                let document = Html::parse_document(html);
                let href = document
                    .select(selector)
                    .find_map(|a| a.value().attr("href"))?
                    .trim();
                if href.is_empty() || href.starts_with('#') {
                    return None;
                }
                current.join(href).ok().map(|url| url.to_string())
            }
        }
    }

    fn is_session_expired(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        let expired = document.select(&self.session_expired).next().is_some();
        expired
    }

    fn parse_fields(&self, html: &str) -> Record {
        let document = Html::parse_document(html);
        let mut record = Record::new();

        for row in document.select(&self.field_row) {
            let mut cells = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| self.cell.matches(cell));

            let (Some(label), Some(value)) = (cells.next(), cells.next()) else {
                continue;
            };

            let key = element_text(label).replace(':', "").trim().to_string();
            if key.is_empty() {
                continue;
            }

            let has_children = value.children().any(|child| child.value().is_element());
            let field = if has_children {
                FieldValue::Multi(value.select(&self.multi_value).map(element_text).collect())
            } else {
                FieldValue::Single(element_text(value))
            };

            record.insert(key, field);
        }

        record
    }
}

/// Collects and trims the text content of an element
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(pagination: PaginationMode) -> ListingConfig {
        ListingConfig {
            url: "https://search.example.com/search".to_string(),
            pagination,
            offset_param: "fh".to_string(),
            count_param: "count".to_string(),
        }
    }

    fn offset_parser(page_size: u32) -> SelectorParser {
        SelectorParser::new(&MarkupConfig::default(), &listing(PaginationMode::Offset), page_size)
            .unwrap()
    }

    fn next_link_parser() -> SelectorParser {
        SelectorParser::new(&MarkupConfig::default(), &listing(PaginationMode::NextLink), 50)
            .unwrap()
    }

    const LISTING: &str = r#"
        <html><body>
        <h2 id="results-header">Results 1-2 of 1,234</h2>
        <table>
            <tr class="record" rid="101" pid="9001" dbid="census"><td>Ada</td></tr>
            <tr class="record" rid="102" pid="9002" dbid="census"><td>Grace</td></tr>
            <tr class="record" rid="103"><td>Broken row</td></tr>
            <tr class="other" rid="104" pid="9004" dbid="census"><td>Not a record</td></tr>
        </table>
        <a class="next" href="/search?page=2">Next</a>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <div class="hoverDataWrapper">
            <table>
                <tr><td>Name:</td><td>Ada Lovelace</td></tr>
                <tr><td>Birth:</td><td> 1815 </td></tr>
                <tr><td>Household Members:</td><td>
                    <span class="unveiled_label">Ada</span>
                    <span class="unveiled_label">William</span>
                </td></tr>
                <tr><td>Single cell row</td></tr>
            </table>
        </div>
    "#;

    #[test]
    fn test_parse_total_count() {
        let parser = offset_parser(50);
        assert_eq!(parser.parse_total_count(LISTING), Some(1234));
    }

    #[test]
    fn test_parse_total_count_missing() {
        let parser = offset_parser(50);
        assert_eq!(parser.parse_total_count("<html><body></body></html>"), None);
    }

    #[test]
    fn test_parse_item_list_skips_incomplete_rows() {
        let parser = offset_parser(50);
        let items = parser.parse_item_list(LISTING);

        assert_eq!(
            items,
            vec![
                ItemRef::new("101", "9001", "census"),
                ItemRef::new("102", "9002", "census"),
            ]
        );
    }

    #[test]
    fn test_next_link_resolved_against_current_page() {
        let parser = next_link_parser();
        let current = Url::parse("https://search.example.com/search?page=1").unwrap();

        assert_eq!(
            parser.parse_next_page_token(LISTING, &current),
            Some("https://search.example.com/search?page=2".to_string())
        );
    }

    #[test]
    fn test_next_link_absent_on_last_page() {
        let parser = next_link_parser();
        let current = Url::parse("https://search.example.com/search?page=9").unwrap();
        let html = r#"<html><body><a class="prev" href="/search?page=8">Prev</a></body></html>"#;

        assert_eq!(parser.parse_next_page_token(html, &current), None);
    }

    #[test]
    fn test_offset_pagination_advances_offset() {
        let parser = offset_parser(50);
        let current = Url::parse("https://search.example.com/search?count=50&fh=100").unwrap();

        assert_eq!(
            parser.parse_next_page_token(LISTING, &current),
            Some("https://search.example.com/search?count=50&fh=150".to_string())
        );
    }

    #[test]
    fn test_offset_pagination_stops_at_total() {
        let parser = offset_parser(50);
        let current = Url::parse("https://search.example.com/search?count=50&fh=1200").unwrap();

        assert_eq!(parser.parse_next_page_token(LISTING, &current), None);
    }

    #[test]
    fn test_offset_pagination_without_total_uses_page_fill() {
        let parser = offset_parser(2);
        let current = Url::parse("https://search.example.com/search?fh=0").unwrap();
        let full = r#"<table>
            <tr class="record" rid="1" pid="1" dbid="d"></tr>
            <tr class="record" rid="2" pid="2" dbid="d"></tr>
        </table>"#;
        let partial = r#"<table><tr class="record" rid="3" pid="3" dbid="d"></tr></table>"#;

        assert_eq!(
            parser.parse_next_page_token(full, &current),
            Some("https://search.example.com/search?fh=2&count=2".to_string())
        );
        assert_eq!(parser.parse_next_page_token(partial, &current), None);
    }

    #[test]
    fn test_session_expired_marker() {
        let parser = offset_parser(50);
        let login = r#"<html><body><form id="signInForm"><input name="username"></form></body></html>"#;

        assert!(parser.is_session_expired(login));
        assert!(!parser.is_session_expired(LISTING));
    }

    #[test]
    fn test_parse_fields() {
        let parser = offset_parser(50);
        let record = parser.parse_fields(DETAIL);

        assert_eq!(record.len(), 3);
        assert_eq!(record["Name"], FieldValue::from("Ada Lovelace"));
        assert_eq!(record["Birth"], FieldValue::from("1815"));
        assert_eq!(
            record["Household Members"],
            FieldValue::from(vec!["Ada".to_string(), "William".to_string()])
        );
    }

    #[test]
    fn test_parse_fields_empty_payload() {
        let parser = offset_parser(50);
        assert!(parser.parse_fields("<html></html>").is_empty());
    }

    #[test]
    fn test_invalid_next_link_selector() {
        let markup = MarkupConfig {
            next_link: "a[".to_string(),
            ..MarkupConfig::default()
        };
        let result = SelectorParser::new(&markup, &listing(PaginationMode::NextLink), 50);
        assert!(matches!(result, Err(ConfigError::InvalidSelector(_))));
    }
}
