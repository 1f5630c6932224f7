/// Crawl phase definitions for the pagination state machine
///
/// This module defines every phase the crawl controller moves through while
/// processing a listing.
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    // ===== Active Phases =====
    /// Loading the cursor and fetching the first listing page
    Bootstrapping,

    /// Fetching the listing page named by the cursor
    FetchingPage,

    /// Fetching and persisting the detail resource of every item on the page
    FetchingItems,

    /// Writing the page marker and advancing the cursor
    Checkpointing,

    // ===== Terminal Phases =====
    /// The last page has been checkpointed
    Done,

    /// A fatal error stopped the crawl
    Aborted,
}

impl CrawlPhase {
    /// Returns true if the controller will not leave this phase again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;

        if next == Aborted {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Bootstrapping, FetchingPage)
                | (Bootstrapping, Done)
                | (FetchingPage, FetchingItems)
                | (FetchingItems, Checkpointing)
                | (Checkpointing, FetchingPage)
                | (Checkpointing, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrapping => "bootstrapping",
            Self::FetchingPage => "fetching_page",
            Self::FetchingItems => "fetching_items",
            Self::Checkpointing => "checkpointing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
