//! Frontier management for the crawl
//!
//! This module handles:
//! - The queue of pages waiting to be rendered
//! - Deduplication of queued pages by identity

use crate::url::major_part;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A page queued for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// The URL to render
    pub url: Url,

    /// Whether the URL was given on the command line or in the config
    pub is_seed: bool,
}

impl CrawlRequest {
    /// Creates a request for a seed URL
    pub fn seed(url: Url) -> Self {
        Self { url, is_seed: true }
    }

    /// Creates a request for a link found while rendering
    pub fn discovered(url: Url) -> Self {
        Self {
            url,
            is_seed: false,
        }
    }

    /// Identity used for deduplication: the URL without fragment or trailing slash
    pub fn key(&self) -> String {
        major_part(&self.url)
    }
}

/// Ordered queue of pending crawl requests
///
/// A request is never queued twice while it is pending. Whether it was already
/// rendered is tracked separately by the scheduler's visited set.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CrawlRequest>,
    pending: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request to the back of the queue
    ///
    /// # Returns
    ///
    /// `false` if a request with the same identity is already pending
    pub fn push(&mut self, request: CrawlRequest) -> bool {
        if !self.pending.insert(request.key()) {
            return false;
        }
        self.queue.push_back(request);
        true
    }

    /// Puts requests at the front of the queue, keeping their relative order
    ///
    /// Requests already pending are left where they are.
    ///
    /// # Returns
    ///
    /// The number of requests actually queued
    pub fn push_front_all(&mut self, requests: Vec<CrawlRequest>) -> usize {
        let fresh: Vec<CrawlRequest> = requests
            .into_iter()
            .filter(|request| self.pending.insert(request.key()))
            .collect();

        let added = fresh.len();
        for request in fresh.into_iter().rev() {
            self.queue.push_front(request);
        }
        added
    }

    /// Takes the request at the front of the queue
    pub fn pop(&mut self) -> Option<CrawlRequest> {
        let request = self.queue.pop_front()?;
        self.pending.remove(&request.key());
        Some(request)
    }

    /// Returns the number of queued requests
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the frontier is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
