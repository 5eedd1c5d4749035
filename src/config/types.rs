use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Selector used for Markdown extraction when none is configured
pub const DEFAULT_MARKDOWN_SELECTOR: &str = "body";

/// Main configuration structure for Site-Mirror
///
/// Every section is optional in the TOML file; command-line flags fill in or
/// override values before the configuration is validated and frozen for a run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub denylist: Vec<DenyEntry>,
}

/// Where and what to write
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory of the mirror tree
    pub directory: PathBuf,

    /// Whether to write a Markdown sibling for every rendered page
    #[serde(rename = "generate-markdown")]
    pub generate_markdown: bool,

    /// CSS selectors whose content is converted to Markdown
    pub selectors: Vec<String>,
}

/// How batches of renders are dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// All renders of a batch run concurrently
    #[default]
    Parallel,
    /// Renders of a batch run one after another
    Serial,
}

/// Crawl scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Seed URLs; also the prefixes that bound recursive discovery
    pub seeds: Vec<String>,

    /// Follow links that live under one of the seeds
    pub recursive: bool,

    /// Number of renders per batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Parallel or serial dispatch within a batch
    pub dispatch: DispatchMode,

    /// Upper bound on rendered pages (0 means unlimited)
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Consecutive batches in which every render failed before the crawl halts
    #[serde(rename = "max-failed-batches")]
    pub max_failed_batches: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            recursive: false,
            batch_size: 4,
            dispatch: DispatchMode::Parallel,
            max_pages: 0,
            max_failed_batches: 3,
        }
    }
}

/// Browser launch and navigation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Maximum time a single navigation may take (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Quiet window that counts as network idle (milliseconds)
    #[serde(rename = "idle-window-ms")]
    pub idle_window_ms: u64,

    /// In-flight requests still tolerated while idle
    #[serde(rename = "idle-max-in-flight")]
    pub idle_max_in_flight: usize,

    /// Viewport width in pixels
    #[serde(rename = "viewport-width")]
    pub viewport_width: u32,

    /// Viewport height in pixels
    #[serde(rename = "viewport-height")]
    pub viewport_height: u32,

    /// Run the browser without a window
    pub headless: bool,

    /// Explicit Chrome/Chromium executable; auto-detected when unset
    pub executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            idle_window_ms: 500,
            idle_max_in_flight: 2,
            viewport_width: 1280,
            viewport_height: 768,
            headless: true,
            executable: None,
        }
    }
}

impl BrowserConfig {
    /// Navigation timeout as a duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Network idle window as a duration
    pub fn idle_window(&self) -> Duration {
        Duration::from_millis(self.idle_window_ms)
    }
}

/// A single denylist entry (exact URL or wildcard pattern)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DenyEntry {
    pub pattern: String,
}

impl MirrorConfig {
    /// Selectors used for Markdown extraction, falling back to the whole body
    pub fn markdown_selectors(&self) -> Vec<String> {
        if self.output.selectors.is_empty() {
            vec![DEFAULT_MARKDOWN_SELECTOR.to_string()]
        } else {
            self.output.selectors.clone()
        }
    }
}
