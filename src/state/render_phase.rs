/// Render phase definitions for tracking a page through one browser tab
///
/// A render walks `Idle → Navigating → Capturing → (ExtractingMarkdown)? →
/// (HarvestingLinks)? → Closed`. `Closed` is reachable from every other phase
/// because the tab is released even when an earlier step fails.
use crate::MirrorError;
use std::fmt;

/// Represents the current phase of a page render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPhase {
    /// Tab is open, nothing has happened yet
    Idle,

    /// Interception is on and the tab is navigating to the page
    Navigating,

    /// Network settled; buffered responses are being persisted
    Capturing,

    /// Selector content is being converted to Markdown
    ExtractingMarkdown,

    /// Anchors are being collected for recursion
    HarvestingLinks,

    /// Tab released
    Closed,
}

impl RenderPhase {
    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: RenderPhase) -> bool {
        use RenderPhase::*;

        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Idle, Navigating) => true,
            (Navigating, Capturing) => true,
            (Capturing, ExtractingMarkdown | HarvestingLinks) => true,
            (ExtractingMarkdown, HarvestingLinks) => true,
            _ => false,
        }
    }

    /// Returns true once the tab has been released
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Navigating => "navigating",
            Self::Capturing => "capturing",
            Self::ExtractingMarkdown => "extracting_markdown",
            Self::HarvestingLinks => "harvesting_links",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the phase of a single render and rejects illegal transitions
#[derive(Debug)]
pub struct PhaseTracker {
    url: String,
    phase: RenderPhase,
}

impl PhaseTracker {
    /// Starts tracking a render in the `Idle` phase
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            phase: RenderPhase::Idle,
        }
    }

    /// Current phase
    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Moves to the next phase
    pub fn advance(&mut self, next: RenderPhase) -> Result<(), MirrorError> {
        if !self.phase.can_transition_to(next) {
            return Err(MirrorError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }

        tracing::trace!("{}: {} -> {}", self.url, self.phase, next);
        self.phase = next;
        Ok(())
    }
}
