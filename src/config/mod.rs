//! Configuration module for Site-Mirror
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. A configuration file is optional: the command line can supply every
//! required value, and its flags override whatever the file sets.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring into: {}", config.output.directory.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, CrawlerConfig, DenyEntry, DispatchMode, MirrorConfig, OutputConfig,
    DEFAULT_MARKDOWN_SELECTOR,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, read_config};
pub use validation::validate;
