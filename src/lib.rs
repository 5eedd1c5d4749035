//! Site-Mirror: a headless-browser site mirroring engine
//!
//! This crate drives a headless browser across one or more web origins, saves
//! every fetched resource into a local tree that mirrors the URL structure,
//! and can extract selected page fragments into Markdown.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod filter;
pub mod output;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Site-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Markdown conversion failed: {0}")]
    Markdown(String),

    #[error("Invalid render transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RenderPhase,
        to: state::RenderPhase,
    },

    #[error("Crawl aborted after {failed_batches} consecutive failed batches")]
    CrawlAborted { failed_batches: u32 },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid denylist pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL '{url}': {reason}")]
    Parse { url: String, reason: String },

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Site-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

// Re-export commonly used types
pub use config::MirrorConfig;
pub use crawler::{run_mirror, CrawlScheduler, PageRenderer};
pub use filter::RequestFilter;
pub use state::RenderPhase;
pub use url::{in_sub_folder, major_part_of, map_to_path, markdown_path};
