//! Deciding what to keep from a capture phase
//!
//! Given the fixed [`CaptureLog`] of one render, [`plan_capture`] decides for
//! every buffered response whether it is written to the mirror tree and where.
//! The plan is pure; reading bodies and writing files is left to the renderer.

use crate::browser::{CaptureLog, CapturedResponse};
use crate::filter::RequestFilter;
use crate::url::{map_to_path, parse_http_url};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Why a buffered response is not written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Inline `data:` URL
    DataUrl,

    /// 3xx response; the redirect target produces its own response
    Redirect(u16),

    /// 404 response
    NotFound,

    /// A later keepable response for the same URL exists in the log
    Superseded,

    /// The URL is on the denylist
    Blocked,

    /// The URL cannot be mapped to a path
    Unmappable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataUrl => write!(f, "data url"),
            Self::Redirect(status) => write!(f, "redirect ({})", status),
            Self::NotFound => write!(f, "not found"),
            Self::Superseded => write!(f, "superseded"),
            Self::Blocked => write!(f, "blocked"),
            Self::Unmappable => write!(f, "unmappable url"),
        }
    }
}

/// What to do with one buffered response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureAction {
    /// Read the body and write it to `path`
    Persist { path: PathBuf, is_html: bool },

    /// Leave the response alone
    Skip(SkipReason),
}

/// A buffered response paired with its planned action
#[derive(Debug, Clone)]
pub struct PlannedResponse<'a> {
    pub response: &'a CapturedResponse,
    pub action: CaptureAction,
}

/// Returns true if a content type denotes an HTML document
pub fn is_html_content(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("html")
}

/// Plans the fate of every response in a capture log, in arrival order
///
/// # Skip Rules
///
/// 1. `data:` URLs
/// 2. Status 300-399
/// 3. Status 404
/// 4. A later response for the same URL that passes rules 1-3 exists in the
///    log (last one wins)
/// 5. The URL matches the denylist
///
/// Every other response is persisted at the path [`map_to_path`] gives for it,
/// treated as HTML when its content type contains `html`.
pub fn plan_capture<'a>(
    log: &'a CaptureLog,
    out_dir: &Path,
    filter: &RequestFilter,
) -> Vec<PlannedResponse<'a>> {
    let mut last_seen: HashMap<&str, usize> = HashMap::new();
    for (index, response) in log.responses.iter().enumerate() {
        if status_skip(response).is_none() {
            last_seen.insert(response.url.as_str(), index);
        }
    }

    log.responses
        .iter()
        .enumerate()
        .map(|(index, response)| PlannedResponse {
            response,
            action: plan_one(index, response, &last_seen, out_dir, filter),
        })
        .collect()
}

fn plan_one(
    index: usize,
    response: &CapturedResponse,
    last_seen: &HashMap<&str, usize>,
    out_dir: &Path,
    filter: &RequestFilter,
) -> CaptureAction {
    if let Some(reason) = status_skip(response) {
        return CaptureAction::Skip(reason);
    }
    if last_seen.get(response.url.as_str()) != Some(&index) {
        return CaptureAction::Skip(SkipReason::Superseded);
    }
    if filter.is_blocked(&response.url) {
        return CaptureAction::Skip(SkipReason::Blocked);
    }

    let Ok(url) = parse_http_url(&response.url) else {
        return CaptureAction::Skip(SkipReason::Unmappable);
    };

    let is_html = is_html_content(&response.content_type);
    CaptureAction::Persist {
        path: map_to_path(&url, out_dir, is_html),
        is_html,
    }
}

/// Skip rules that depend only on the response itself
fn status_skip(response: &CapturedResponse) -> Option<SkipReason> {
    if response.url.starts_with("data:") {
        Some(SkipReason::DataUrl)
    } else if (300..=399).contains(&response.status) {
        Some(SkipReason::Redirect(response.status))
    } else if response.status == 404 {
        Some(SkipReason::NotFound)
    } else {
        None
    }
}
