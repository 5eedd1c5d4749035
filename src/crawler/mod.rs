//! Crawler module for rendering and mirroring pages
//!
//! This module contains the core mirroring logic, including:
//! - Planning which captured responses are written
//! - Rendering one page per browser tab
//! - Frontier management and deduplication
//! - Overall crawl coordination

mod capture;
mod coordinator;
mod renderer;
mod scheduler;

pub use capture::{is_html_content, plan_capture, CaptureAction, PlannedResponse, SkipReason};
pub use coordinator::{mirror_with, parse_seeds, run_mirror, CrawlScheduler};
pub use renderer::{harvest_links, PageRenderer, RenderResult};
pub use scheduler::{CrawlRequest, Frontier};
