//! The persisted pagination cursor

use std::fmt;

/// Resumption token for the crawl
///
/// Exactly one cursor exists per checkpoint store. It always names the next
/// listing page that has not been fully processed, or records that the crawl
/// reached the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Absolute URL of the next listing page to process
    Next(String),

    /// The last page has been checkpointed
    Done,
}

impl Cursor {
    /// Token written for a finished crawl. Listing URLs are absolute, so this
    /// can never collide with a real page token.
    pub const DONE_TOKEN: &'static str = "done";

    /// Parses a stored token. Returns None for an empty token.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "" => None,
            Self::DONE_TOKEN => Some(Self::Done),
            url => Some(Self::Next(url.to_string())),
        }
    }

    /// Returns the token to persist for this cursor
    pub fn as_token(&self) -> &str {
        match self {
            Self::Next(url) => url,
            Self::Done => Self::DONE_TOKEN,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Builds the cursor that follows a page with the given next-page token
    pub fn after(next: Option<String>) -> Self {
        next.map(Self::Next).unwrap_or(Self::Done)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// The cursor together with the index of the page it names
///
/// Both are persisted in one write so the index can never drift from the
/// cursor. Stores written before the index existed read back `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub cursor: Cursor,
    pub page_index: Option<u64>,
}

impl Checkpoint {
    pub fn new(cursor: Cursor, page_index: u64) -> Self {
        Self {
            cursor,
            page_index: Some(page_index),
        }
    }

    /// A checkpoint without a recorded page index
    pub fn without_index(cursor: Cursor) -> Self {
        Self {
            cursor,
            page_index: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_is_none() {
        assert_eq!(Cursor::parse(""), None);
        assert_eq!(Cursor::parse("  \n"), None);
    }

    #[test]
    fn test_parse_trims_trailing_newline() {
        assert_eq!(
            Cursor::parse("https://example.com/search?fh=50\n"),
            Some(Cursor::Next("https://example.com/search?fh=50".to_string()))
        );
    }

    #[test]
    fn test_done_token() {
        assert_eq!(Cursor::parse("done"), Some(Cursor::Done));
        assert_eq!(Cursor::Done.as_token(), "done");
        assert!(Cursor::Done.is_done());
    }

    #[test]
    fn test_after_without_next_is_done() {
        assert_eq!(Cursor::after(None), Cursor::Done);
        assert_eq!(
            Cursor::after(Some("https://example.com/2".to_string())),
            Cursor::Next("https://example.com/2".to_string())
        );
    }
}
