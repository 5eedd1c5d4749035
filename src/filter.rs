//! Request filtering for ad and tracker blocking
//!
//! The [`RequestFilter`] is consulted for every outgoing request the browser
//! makes while a page renders. Blocked requests are failed with an explicit
//! reason by the browser layer, so they never produce a response and never
//! reach the mirror tree.

use crate::config::DenyEntry;
use crate::url::matches_wildcard;

/// Denylist of request URLs, matched by exact string or wildcard pattern
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    patterns: Vec<String>,
}

impl RequestFilter {
    /// Creates a filter from raw patterns
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a filter from the configured denylist entries
    pub fn from_entries(entries: &[DenyEntry]) -> Self {
        Self::new(entries.iter().map(|entry| entry.pattern.clone()))
    }

    /// Returns true if the request URL matches any denylist entry
    pub fn is_blocked(&self, url: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| matches_wildcard(pattern, url))
    }
}
