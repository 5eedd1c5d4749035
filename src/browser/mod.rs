//! Browser control boundary
//!
//! The crawler talks to the browser only through [`BrowserEngine`] and
//! [`Tab`]. [`ChromiumBrowser`] implements them over the Chrome DevTools
//! Protocol; tests substitute an in-memory browser.
//!
//! A tab's network activity is observed in a bounded capture phase: observers
//! are registered by [`Tab::start_capture`] before navigation, and
//! [`Tab::finish_capture`] stops them and hands back a fixed [`CaptureLog`].

mod chromium;
mod idle;

pub use chromium::{ChromiumBrowser, ChromiumTab};
pub use idle::wait_for_network_idle;

use crate::filter::RequestFilter;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Browser-specific errors
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Failed to open tab: {0}")]
    Tab(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("DevTools protocol error: {0}")]
    Protocol(String),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),
}

/// A response observed during a capture phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    /// Browser-assigned request identifier, used to read the body
    pub request_id: String,

    /// Final URL of the response
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value (empty when absent)
    pub content_type: String,

    /// Served from the browser cache despite caching being disabled
    pub from_cache: bool,
}

/// A request the browser reported as failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRequest {
    pub url: String,
    pub reason: String,
}

/// Everything observed between the start and the end of a capture phase
#[derive(Debug, Clone, Default)]
pub struct CaptureLog {
    /// Responses in arrival order
    pub responses: Vec<CapturedResponse>,

    /// Requests that failed (diagnostic only)
    pub failures: Vec<FailedRequest>,

    /// Requests aborted by the denylist
    pub blocked: usize,
}

/// How a navigation settles
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Upper bound for navigation plus settling
    pub timeout: Duration,

    /// Quiet period that counts as network idle
    pub idle_window: Duration,

    /// In-flight requests still tolerated during the quiet period
    pub idle_max_in_flight: usize,
}

impl NavigationOptions {
    /// Builds navigation options from the browser configuration
    pub fn from_config(config: &crate::config::BrowserConfig) -> Self {
        Self {
            timeout: config.navigation_timeout(),
            idle_window: config.idle_window(),
            idle_max_in_flight: config.idle_max_in_flight,
        }
    }
}

/// A running browser instance shared by every tab of a crawl run
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    type Tab: Tab;

    /// Opens a fresh tab
    async fn open_tab(&self) -> Result<Self::Tab, BrowserError>;

    /// Shuts the browser down
    async fn close(self) -> Result<(), BrowserError>
    where
        Self: Sized;
}

/// One exclusive browser tab
#[async_trait]
pub trait Tab: Send {
    /// Enables interception, disables the cache and registers the request,
    /// response and failure observers
    async fn start_capture(&mut self, filter: Arc<RequestFilter>) -> Result<(), BrowserError>;

    /// Navigates and waits for the network to go idle
    async fn navigate(&mut self, url: &Url, options: &NavigationOptions)
        -> Result<(), BrowserError>;

    /// Stops the observers and returns what they saw
    async fn finish_capture(&mut self) -> CaptureLog;

    /// Reads the body of a captured response
    async fn response_body(&self, response: &CapturedResponse) -> Result<Vec<u8>, BrowserError>;

    /// Serializes the current document
    async fn content(&self) -> Result<String, BrowserError>;

    /// Inner HTML of every element matching each selector, grouped by selector
    async fn select_inner_html(
        &self,
        selectors: &[String],
    ) -> Result<Vec<Vec<String>>, BrowserError>;

    /// Resolved absolute `href` of every anchor in the document
    async fn anchor_hrefs(&self) -> Result<Vec<String>, BrowserError>;

    /// Releases the tab
    async fn close(self) -> Result<(), BrowserError>
    where
        Self: Sized;
}
