//! Rendering a single page in one browser tab
//!
//! A render opens a tab, captures every resource the page loads, writes the
//! rendered document, optionally converts selected fragments to Markdown and
//! optionally collects links for recursion. Failures after the tab is open
//! are logged and counted; the render always reaches the closed phase.

use crate::browser::{BrowserEngine, CaptureLog, NavigationOptions, Tab};
use crate::config::MirrorConfig;
use crate::crawler::capture::{plan_capture, CaptureAction};
use crate::crawler::scheduler::CrawlRequest;
use crate::filter::RequestFilter;
use crate::output::{html_to_markdown, join_fragments, MirrorStats, ResponseSink};
use crate::state::{PhaseTracker, RenderPhase, VisitedSet};
use crate::url::{in_sub_folder, major_part, map_to_path, markdown_path, parse_http_url};
use crate::MirrorError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Outcome of one render
#[derive(Debug, Clone, Default)]
pub struct RenderResult {
    /// In-scope links not yet visited, normalized and deduplicated
    pub discovered_links: Vec<Url>,
}

/// Drives browser tabs through the render phases
pub struct PageRenderer {
    out_dir: PathBuf,
    selectors: Vec<String>,
    generate_markdown: bool,
    recursive: bool,
    seeds: Vec<String>,
    filter: Arc<RequestFilter>,
    sink: ResponseSink,
    navigation: NavigationOptions,
    stats: Arc<MirrorStats>,
}

impl PageRenderer {
    /// Creates a renderer for one run
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration
    /// * `seeds` - Serialized seed URLs; discovered links must start with one of them
    /// * `stats` - Counters shared with the rest of the run
    pub fn new(config: &MirrorConfig, seeds: Vec<String>, stats: Arc<MirrorStats>) -> Self {
        Self {
            out_dir: config.output.directory.clone(),
            selectors: config.markdown_selectors(),
            generate_markdown: config.output.generate_markdown,
            recursive: config.crawler.recursive,
            seeds,
            filter: Arc::new(RequestFilter::from_entries(&config.denylist)),
            sink: ResponseSink::new(stats.clone()),
            navigation: NavigationOptions::from_config(&config.browser),
            stats,
        }
    }

    /// Renders one page in a fresh tab
    ///
    /// # Returns
    ///
    /// * `Ok(RenderResult)` - The render ran to completion; individual
    ///   navigation, capture and write failures were logged and counted
    /// * `Err(MirrorError::Browser)` - No tab could be opened
    pub async fn render<B: BrowserEngine>(
        &self,
        browser: &B,
        request: &CrawlRequest,
        visited: &VisitedSet,
    ) -> Result<RenderResult, MirrorError> {
        let mut tab = match browser.open_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                self.stats.record_tab_failures(1);
                return Err(e.into());
            }
        };

        let mut tracker = PhaseTracker::new(request.url.as_str());
        let mut result = RenderResult::default();

        if let Err(e) = self
            .drive(&mut tab, &mut tracker, request, visited, &mut result)
            .await
        {
            tracing::warn!("Render of {} stopped early: {}", request.url, e);
        }

        if let Err(e) = tab.close().await {
            tracing::warn!("Failed to close tab for {}: {}", request.url, e);
        }
        tracker.advance(RenderPhase::Closed)?;

        self.stats.record_pages_rendered(1);
        tracing::info!("rendered {}.", request.url);

        Ok(result)
    }

    async fn drive<T: Tab>(
        &self,
        tab: &mut T,
        tracker: &mut PhaseTracker,
        request: &CrawlRequest,
        visited: &VisitedSet,
        result: &mut RenderResult,
    ) -> Result<(), MirrorError> {
        let url = &request.url;

        tracker.advance(RenderPhase::Navigating)?;
        if let Err(e) = tab.start_capture(self.filter.clone()).await {
            tracing::warn!("Failed to start capture for {}: {}", url, e);
        }
        if let Err(e) = tab.navigate(url, &self.navigation).await {
            self.stats.record_navigation_errors(1);
            tracing::warn!("{}", e);
        }

        tracker.advance(RenderPhase::Capturing)?;
        let log = tab.finish_capture().await;
        self.persist_captured(tab, &log).await;

        let html_path = map_to_path(url, &self.out_dir, true);
        if self.filter.is_blocked(url.as_str()) {
            tracing::debug!("Not snapshotting blocked page {}", url);
        } else {
            match tab.content().await {
                Ok(html) => self.write(&html_path, html.as_bytes()).await,
                Err(e) => tracing::warn!("Failed to serialize {}: {}", url, e),
            }
        }

        if self.generate_markdown {
            tracker.advance(RenderPhase::ExtractingMarkdown)?;
            self.write_markdown(tab, url, &html_path).await;
        }

        if self.recursive {
            tracker.advance(RenderPhase::HarvestingLinks)?;
            match tab.anchor_hrefs().await {
                Ok(hrefs) => {
                    result.discovered_links = harvest_links(&hrefs, &self.seeds, visited);
                    tracing::debug!(
                        "Found {} new links on {}",
                        result.discovered_links.len(),
                        url
                    );
                }
                Err(e) => tracing::warn!("Failed to collect links on {}: {}", url, e),
            }
        }

        Ok(())
    }

    /// Writes every response the capture plan keeps
    async fn persist_captured<T: Tab>(&self, tab: &T, log: &CaptureLog) {
        self.stats.record_requests_blocked(log.blocked as u64);
        self.stats.record_request_failures(log.failures.len() as u64);

        for planned in plan_capture(log, &self.out_dir, &self.filter) {
            let response = planned.response;
            if response.from_cache {
                self.stats.record_cache_hits(1);
                tracing::warn!("{} was served from cache", response.url);
            }

            match planned.action {
                CaptureAction::Skip(reason) => {
                    self.stats.record_responses_skipped(1);
                    tracing::debug!("Skipping {} ({})", response.url, reason);
                }
                CaptureAction::Persist { path, .. } => match tab.response_body(response).await {
                    Ok(bytes) => self.write(&path, &bytes).await,
                    Err(e) => {
                        tracing::warn!("Failed to read body of {}: {}", response.url, e)
                    }
                },
            }
        }
    }

    async fn write_markdown<T: Tab>(&self, tab: &T, url: &Url, html_path: &Path) {
        let fragments = match tab.select_inner_html(&self.selectors).await {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::warn!("Failed to extract selectors on {}: {}", url, e);
                return;
            }
        };

        let markdown = match html_to_markdown(&join_fragments(&fragments)) {
            Ok(markdown) => markdown,
            Err(e) => {
                tracing::warn!("{} ({})", e, url);
                return;
            }
        };

        match self.sink.persist(&markdown_path(html_path), markdown.as_bytes()).await {
            Ok(()) => self.stats.record_markdown_written(1),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    async fn write(&self, path: &Path, bytes: &[u8]) {
        if let Err(e) = self.sink.persist(path, bytes).await {
            tracing::warn!("{}", e);
        }
    }
}

/// Filters anchor targets down to new in-scope pages
///
/// Keeps links that parse as HTTP(S) and start with one of `seeds`, reduces
/// them to their major part, drops duplicates and anything already visited.
/// Document order is preserved.
pub fn harvest_links(hrefs: &[String], seeds: &[String], visited: &VisitedSet) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in hrefs {
        if !in_sub_folder(href, seeds) {
            continue;
        }

        let url = match parse_http_url(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Ignoring link {}: {}", href, e);
                continue;
            }
        };

        let key = major_part(&url);
        if visited.contains(&key) || !seen.insert(key.clone()) {
            continue;
        }

        match Url::parse(&key) {
            Ok(url) => links.push(url),
            Err(e) => tracing::debug!("Ignoring link {}: {}", href, e),
        }
    }

    links
}
