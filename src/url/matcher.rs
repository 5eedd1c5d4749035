/// Checks if a URL matches a denylist pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: a pattern without `*` matches only the identical string
/// 2. Wildcard match: each `*` matches any run of characters (including none),
///    e.g. `*doubleclick.net*` or `https://cdn.example.com/ads/*`
///
/// # Arguments
///
/// * `pattern` - The denylist pattern
/// * `candidate` - The URL to check against the pattern
///
/// # Examples
///
/// ```
/// use site_mirror::url::matches_wildcard;
///
/// // Exact match
/// assert!(matches_wildcard("https://a.com/ga.js", "https://a.com/ga.js"));
/// assert!(!matches_wildcard("https://a.com/ga.js", "https://a.com/ga.js?v=2"));
///
/// // Wildcard match
/// assert!(matches_wildcard("*doubleclick.net*", "https://ad.doubleclick.net/x"));
/// assert!(matches_wildcard("https://a.com/ads/*", "https://a.com/ads/banner.png"));
/// assert!(!matches_wildcard("https://a.com/ads/*", "https://a.com/img/banner.png"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return candidate == pattern;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];

    let Some(mut rest) = candidate.strip_prefix(first) else {
        return false;
    };

    // Leftmost match for each inner literal leaves the most room for the rest
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }

    rest.ends_with(last)
}
