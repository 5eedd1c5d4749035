//! Output module for writing the mirror tree
//!
//! This module handles:
//! - Persisting fetched resources to disk
//! - Converting extracted HTML fragments to Markdown
//! - Recording run statistics

mod markdown;
mod sink;
pub mod stats;

pub use markdown::{html_to_markdown, join_fragments, FRAGMENT_SEPARATOR};
pub use sink::ResponseSink;
pub use stats::{print_statistics, CrawlStatistics, MirrorStats};
