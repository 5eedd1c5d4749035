//! URL handling module for Site-Mirror
//!
//! This module provides URL normalization (the "major part" used for
//! deduplication), host extraction, wildcard matching, subfolder checks and the
//! mapping from URLs to mirrored file paths.

mod domain;
mod matcher;
mod normalize;
mod path;

// Re-export main functions
pub use domain::host_key;
pub use matcher::matches_wildcard;
pub use normalize::{major_part, major_part_of, parse_http_url};
pub use path::{map_to_path, markdown_path};

/// Checks whether a discovered link lives under one of the seed URLs
///
/// This is a plain string-prefix test against each seed, not a same-origin
/// check. When a seed does not end in `/`, the character following the prefix
/// must be a path, query or fragment boundary, so `https://a.com/docs` does not
/// claim `https://a.com/docs2/page`. This boundary check makes the test
/// stricter than a bare prefix match on purpose.
///
/// # Examples
///
/// ```
/// use site_mirror::url::in_sub_folder;
///
/// let seeds = vec!["https://a.com/docs/".to_string()];
/// assert!(in_sub_folder("https://a.com/docs/intro", &seeds));
/// assert!(!in_sub_folder("https://a.com/blog/post", &seeds));
/// ```
pub fn in_sub_folder(link: &str, seeds: &[String]) -> bool {
    seeds.iter().any(|seed| {
        let Some(rest) = link.strip_prefix(seed.as_str()) else {
            return false;
        };
        seed.ends_with('/')
            || rest.is_empty()
            || rest.starts_with('/')
            || rest.starts_with('?')
            || rest.starts_with('#')
    })
}
