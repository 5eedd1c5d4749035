use crate::UrlError;
use url::Url;

/// Parses a seed or discovered URL, accepting only HTTP(S) URLs with a host
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - The URL is malformed, uses another scheme, or has no host
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse {
        url: url_str.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(url_str.to_string()));
    }

    Ok(url)
}

/// Returns the major part of an already parsed URL
///
/// The major part is the serialized URL with its fragment removed and a single
/// trailing slash stripped from the path. A slash at the end of the query is
/// left alone. It is the identity used to deduplicate crawl requests.
pub fn major_part(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let serialized = url.as_str();
    if url.query().is_some() {
        return serialized.to_string();
    }
    serialized
        .strip_suffix('/')
        .unwrap_or(serialized)
        .to_string()
}

/// Computes the major part of a URL string
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Remove the fragment (everything after `#`)
/// 3. Remove one trailing slash
///
/// # Examples
///
/// ```
/// use site_mirror::url::major_part_of;
///
/// let a = major_part_of("https://a.com/x/#frag").unwrap();
/// let b = major_part_of("https://a.com/x").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a, "https://a.com/x");
/// ```
pub fn major_part_of(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse {
        url: url_str.to_string(),
        reason: e.to_string(),
    })?;
    Ok(major_part(&url))
}
