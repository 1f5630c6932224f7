//! Progress lines logged while crawling

use std::time::Duration;

/// Formats a duration as `HH:MM:SS`; hours are not wrapped at 24
pub fn format_eta(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Line announcing the items of the page starting at `offset`
///
/// `count` is the number of items on the page. Positions are 1-based and the
/// upper bound never exceeds the listing total.
pub fn progress_line(offset: u64, count: u64, total: Option<u64>) -> String {
    let first = offset + 1;
    match total {
        Some(total) => {
            let last = (offset + count).min(total);
            format!("Downloading {} through {} of {}", first, last, total)
        }
        None => format!("Downloading {} through {}", first, offset + count),
    }
}
