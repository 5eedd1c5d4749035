//! State module for tracking crawl progress
//!
//! This module provides state management for the crawl run and for each page
//! render.
//!
//! # Components
//!
//! - `RenderPhase` / `PhaseTracker`: the per-tab render state machine
//! - `VisitedSet`: run-wide set of admitted URL identities

mod render_phase;
mod visited;

// Re-export main types
pub use render_phase::{PhaseTracker, RenderPhase};
pub use visited::VisitedSet;
