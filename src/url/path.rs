use crate::url::host_key;
use std::path::{Path, PathBuf};
use url::Url;

/// Maps a fetched URL to its location inside the mirror tree
///
/// The result is always `out_dir/<host>/<decoded path>`, with `index.html`
/// appended when the resource is HTML but its path has no `.html`/`.htm`
/// extension, or when the path is directory-style (ends in `/`).
///
/// Empty, `.` and `..` segments are dropped, so a decoded path can never
/// climb out of `out_dir`. The query string does not take part in the
/// mapping; URLs that differ only by query share a path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use url::Url;
/// use site_mirror::url::map_to_path;
///
/// let out = Path::new("out");
/// let url = Url::parse("https://a.com/x/").unwrap();
/// assert_eq!(map_to_path(&url, out, true), out.join("a.com/x/index.html"));
///
/// let url = Url::parse("https://a.com/img.png").unwrap();
/// assert_eq!(map_to_path(&url, out, false), out.join("a.com/img.png"));
/// ```
pub fn map_to_path(url: &Url, out_dir: &Path, is_html: bool) -> PathBuf {
    let decoded = urlencoding::decode(url.path())
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| url.path().to_string());

    let is_directory = decoded.ends_with('/');
    let segments: Vec<&str> = decoded
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect();

    let mut path = out_dir.join(host_key(url).unwrap_or_default());
    for segment in &segments {
        path.push(segment);
    }

    let has_html_extension = segments.last().is_some_and(|last| {
        let last = last.to_ascii_lowercase();
        last.ends_with(".html") || last.ends_with(".htm")
    });

    if (is_html && !has_html_extension) || is_directory || segments.is_empty() {
        path.push("index.html");
    }

    path
}

/// Returns the Markdown sibling of a mirrored HTML file
///
/// A trailing `.html` is replaced by `.md`; any other file name gets `.md`
/// appended. The directory is unchanged.
pub fn markdown_path(html_path: &Path) -> PathBuf {
    let file_name = html_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = file_name.strip_suffix(".html").unwrap_or(&file_name);
    html_path.with_file_name(format!("{}.md", stem))
}
