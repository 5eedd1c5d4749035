//! Run statistics for a mirror run
//!
//! Counters are bumped by renderers and the response sink while the crawl is
//! in progress, then snapshotted into [`CrawlStatistics`] and printed once the
//! run completes.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by every component of a run
#[derive(Debug, Default)]
pub struct MirrorStats {
    pages_rendered: AtomicU64,
    tab_failures: AtomicU64,
    navigation_errors: AtomicU64,
    files_written: AtomicU64,
    write_errors: AtomicU64,
    responses_skipped: AtomicU64,
    requests_blocked: AtomicU64,
    request_failures: AtomicU64,
    cache_hits: AtomicU64,
    markdown_written: AtomicU64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        pub fn $record(&self, n: u64) {
            self.$field.fetch_add(n, Ordering::Relaxed);
        }
    };
}

impl MirrorStats {
    /// Creates a zeroed set of counters
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_pages_rendered, pages_rendered);
    counter!(record_tab_failures, tab_failures);
    counter!(record_navigation_errors, navigation_errors);
    counter!(record_files_written, files_written);
    counter!(record_write_errors, write_errors);
    counter!(record_responses_skipped, responses_skipped);
    counter!(record_requests_blocked, requests_blocked);
    counter!(record_request_failures, request_failures);
    counter!(record_cache_hits, cache_hits);
    counter!(record_markdown_written, markdown_written);

    /// Takes a point-in-time copy of every counter
    pub fn snapshot(&self) -> CrawlStatistics {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CrawlStatistics {
            pages_rendered: load(&self.pages_rendered),
            tab_failures: load(&self.tab_failures),
            navigation_errors: load(&self.navigation_errors),
            files_written: load(&self.files_written),
            write_errors: load(&self.write_errors),
            responses_skipped: load(&self.responses_skipped),
            requests_blocked: load(&self.requests_blocked),
            request_failures: load(&self.request_failures),
            cache_hits: load(&self.cache_hits),
            markdown_written: load(&self.markdown_written),
        }
    }
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Pages whose render reached the closed phase
    pub pages_rendered: u64,

    /// Pages for which no tab could be opened
    pub tab_failures: u64,

    /// Navigations that failed or timed out
    pub navigation_errors: u64,

    /// Files written to the mirror tree (page snapshots included)
    pub files_written: u64,

    /// Files that could not be written
    pub write_errors: u64,

    /// Responses skipped by the capture rules
    pub responses_skipped: u64,

    /// Requests aborted by the denylist
    pub requests_blocked: u64,

    /// Requests the browser reported as failed
    pub request_failures: u64,

    /// Responses served from the browser cache
    pub cache_hits: u64,

    /// Markdown files written
    pub markdown_written: u64,
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!("Pages:");
    println!("  Rendered: {}", stats.pages_rendered);
    println!("  Tab failures: {}", stats.tab_failures);
    println!("  Navigation errors: {}", stats.navigation_errors);
    println!();

    println!("Files:");
    println!("  Written: {}", stats.files_written);
    println!("  Markdown: {}", stats.markdown_written);
    println!("  Write errors: {}", stats.write_errors);
    println!();

    println!("Network:");
    println!("  Responses skipped: {}", stats.responses_skipped);
    println!("  Requests blocked: {}", stats.requests_blocked);
    println!("  Request failures: {}", stats.request_failures);
    if stats.cache_hits > 0 {
        println!("  Cache hits (unexpected): {}", stats.cache_hits);
    }
}
