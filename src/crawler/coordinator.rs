//! Crawl coordination - the main mirror loop
//!
//! This module contains the loop that drives a mirror run:
//! - Seeding the frontier from the configured URLs
//! - Admitting pages against the visited set right before dispatch
//! - Dispatching batches of renders in parallel or one by one
//! - Feeding discovered links back into the frontier in recursive mode
//! - Stopping on an exhausted frontier, the page cap or repeated batch failure

use crate::browser::{BrowserEngine, ChromiumBrowser};
use crate::config::{DispatchMode, MirrorConfig};
use crate::crawler::renderer::{PageRenderer, RenderResult};
use crate::crawler::scheduler::{CrawlRequest, Frontier};
use crate::output::{CrawlStatistics, MirrorStats};
use crate::state::VisitedSet;
use crate::url::parse_http_url;
use crate::MirrorError;
use futures::future::join_all;
use std::sync::Arc;
use url::Url;

/// Owns the frontier and visited set of one run and drives the renderer
pub struct CrawlScheduler {
    renderer: PageRenderer,
    frontier: Frontier,
    visited: VisitedSet,
    batch_size: usize,
    dispatch: DispatchMode,
    recursive: bool,
    max_pages: usize,
    max_failed_batches: u32,
}

impl CrawlScheduler {
    /// Creates a scheduler with the seeds queued
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration
    /// * `seeds` - Parsed seed URLs; duplicates by major part are queued once
    /// * `stats` - Counters shared with the renderer
    pub fn new(config: &MirrorConfig, seeds: &[Url], stats: Arc<MirrorStats>) -> Self {
        let seed_prefixes = seeds.iter().map(|url| url.to_string()).collect();

        let mut frontier = Frontier::new();
        for seed in seeds {
            if !frontier.push(CrawlRequest::seed(seed.clone())) {
                tracing::debug!("Duplicate seed {}", seed);
            }
        }

        Self {
            renderer: PageRenderer::new(config, seed_prefixes, stats),
            frontier,
            visited: VisitedSet::new(),
            batch_size: config.crawler.batch_size.max(1),
            dispatch: config.crawler.dispatch,
            recursive: config.crawler.recursive,
            max_pages: config.crawler.max_pages,
            max_failed_batches: config.crawler.max_failed_batches.max(1),
        }
    }

    /// Runs until the frontier is exhausted
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every admitted page was rendered (individual failures are logged)
    /// * `Err(MirrorError::CrawlAborted)` - Too many consecutive batches had
    ///   every render fail
    pub async fn run<B: BrowserEngine>(&mut self, browser: &B) -> Result<(), MirrorError> {
        tracing::info!("Starting mirror with {} seed(s)", self.frontier.len());

        let start_time = std::time::Instant::now();
        let mut failed_batches = 0u32;

        loop {
            let batch = self.admit_batch();
            if batch.is_empty() {
                if self.page_cap_reached() && !self.frontier.is_empty() {
                    tracing::info!(
                        "Page cap of {} reached, leaving {} page(s) unvisited",
                        self.max_pages,
                        self.frontier.len()
                    );
                } else {
                    tracing::info!("Frontier is empty, mirror complete");
                }
                break;
            }

            let results = self.dispatch_batch(browser, &batch).await;

            let mut all_failed = true;
            let mut discovered = Vec::new();
            for (request, result) in batch.iter().zip(results) {
                match result {
                    Ok(render) => {
                        all_failed = false;
                        discovered.extend(render.discovered_links);
                    }
                    Err(e) => tracing::error!("Failed to render {}: {}", request.url, e),
                }
            }

            if all_failed {
                failed_batches += 1;
                tracing::warn!(
                    "Every render in the batch failed ({}/{})",
                    failed_batches,
                    self.max_failed_batches
                );
                if failed_batches >= self.max_failed_batches {
                    return Err(MirrorError::CrawlAborted { failed_batches });
                }
            } else {
                failed_batches = 0;
            }

            if self.recursive {
                self.enqueue_discovered(discovered);
            }

            tracing::info!(
                "Progress: {} pages visited, {} in frontier",
                self.visited.len(),
                self.frontier.len()
            );
        }

        tracing::info!(
            "Mirror completed: {} pages visited in {:?}",
            self.visited.len(),
            start_time.elapsed()
        );

        Ok(())
    }

    /// Pulls the next batch off the frontier, admitting each page into the
    /// visited set as it is taken
    fn admit_batch(&mut self) -> Vec<CrawlRequest> {
        let mut batch = Vec::with_capacity(self.batch_size);

        while batch.len() < self.batch_size && !self.page_cap_reached() {
            let Some(request) = self.frontier.pop() else {
                break;
            };

            if self.visited.admit(request.key()) {
                batch.push(request);
            } else {
                tracing::trace!("Already visited {}", request.url);
            }
        }

        batch
    }

    async fn dispatch_batch<B: BrowserEngine>(
        &self,
        browser: &B,
        batch: &[CrawlRequest],
    ) -> Vec<Result<RenderResult, MirrorError>> {
        match self.dispatch {
            DispatchMode::Parallel => {
                join_all(
                    batch
                        .iter()
                        .map(|request| self.renderer.render(browser, request, &self.visited)),
                )
                .await
            }
            DispatchMode::Serial => {
                let mut results = Vec::with_capacity(batch.len());
                for request in batch {
                    results.push(self.renderer.render(browser, request, &self.visited).await);
                }
                results
            }
        }
    }

    /// Queues newly found links ahead of the remaining siblings
    fn enqueue_discovered(&mut self, links: Vec<Url>) {
        let requests: Vec<CrawlRequest> = links
            .into_iter()
            .map(CrawlRequest::discovered)
            .filter(|request| !self.visited.contains(&request.key()))
            .collect();

        let added = self.frontier.push_front_all(requests);
        if added > 0 {
            tracing::debug!("Queued {} discovered page(s)", added);
        }
    }

    fn page_cap_reached(&self) -> bool {
        self.max_pages > 0 && self.visited.len() >= self.max_pages
    }

    /// Returns the number of pages admitted so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Parses seed URLs, dropping (and logging) the ones that are not HTTP(S)
pub fn parse_seeds(seeds: &[String]) -> Vec<Url> {
    seeds
        .iter()
        .filter_map(|seed| match parse_http_url(seed) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Skipping seed: {}", e);
                None
            }
        })
        .collect()
}

/// Mirrors the configured seeds using an already running browser
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - The run finished
/// * `Err(MirrorError::CrawlAborted)` - The run gave up on repeated batch failure
pub async fn mirror_with<B: BrowserEngine>(
    browser: &B,
    config: &MirrorConfig,
) -> Result<CrawlStatistics, MirrorError> {
    let stats = Arc::new(MirrorStats::new());
    let seeds = parse_seeds(&config.crawler.seeds);

    if seeds.is_empty() {
        tracing::warn!("No valid seed URLs, nothing to mirror");
        return Ok(stats.snapshot());
    }

    let mut scheduler = CrawlScheduler::new(config, &seeds, stats.clone());
    scheduler.run(browser).await?;

    Ok(stats.snapshot())
}

/// Runs a complete mirror operation
///
/// Launches one browser for the run, mirrors every seed (and, in recursive
/// mode, every page found under a seed), then closes the browser.
///
/// # Arguments
///
/// * `config` - The validated run configuration
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Mirror completed
/// * `Err(MirrorError)` - The browser could not be launched or the crawl was aborted
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::load_config;
/// use site_mirror::crawler::run_mirror;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("mirror.toml"))?;
/// let stats = run_mirror(config).await?;
/// println!("{} pages", stats.pages_rendered);
/// # Ok(())
/// # }
/// ```
pub async fn run_mirror(config: MirrorConfig) -> Result<CrawlStatistics, MirrorError> {
    let browser = ChromiumBrowser::launch(&config.browser).await?;

    let outcome = mirror_with(&browser, &config).await;

    if let Err(e) = browser.close().await {
        tracing::warn!("Failed to close browser: {}", e);
    }

    outcome
}
