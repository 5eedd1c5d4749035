use std::collections::HashSet;

/// Run-wide set of URL identities that have been admitted for rendering
///
/// The set only grows. It is owned by the crawl scheduler; renderers receive a
/// shared reference and may only query it.
#[derive(Debug, Default)]
pub struct VisitedSet {
    keys: HashSet<String>,
}

impl VisitedSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the identity was already admitted
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Admits an identity, returning false if it was already present
    pub fn admit(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    /// Number of admitted identities
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns whether nothing has been admitted yet
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
