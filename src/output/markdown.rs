//! HTML to Markdown conversion
//!
//! Selector fragments are joined with a blank line and handed to `htmd` as a
//! single document, so their order in the output is the order they were
//! collected in.

use crate::MirrorError;
use htmd::options::{BulletListMarker, HeadingStyle, Options};
use htmd::HtmlToMarkdown;

/// Separator placed between collected fragments
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Joins fragments collected per selector into one HTML document
///
/// Fragments are kept in selector order, then in document order within each
/// selector.
pub fn join_fragments(per_selector: &[Vec<String>]) -> String {
    per_selector
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}

/// Converts an HTML fragment to Markdown
///
/// ATX headings (`# Title`) and `*` bullets are used.
///
/// # Example
///
/// ```
/// use site_mirror::output::html_to_markdown;
///
/// let md = html_to_markdown("<h1>Title</h1>").unwrap();
/// assert_eq!(md.trim(), "# Title");
/// ```
pub fn html_to_markdown(html: &str) -> Result<String, MirrorError> {
    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            bullet_list_marker: BulletListMarker::Asterisk,
            ..Default::default()
        })
        .build();

    converter
        .convert(html)
        .map_err(|e| MirrorError::Markdown(e.to_string()))
}
