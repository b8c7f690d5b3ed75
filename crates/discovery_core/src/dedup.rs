use std::collections::HashSet;

/// Set of accepted urls.
///
/// `insert_if_absent` is the only authority on whether a record is kept;
/// shared instances must guard it with a lock so the check and the insert
/// happen as one step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DedupIndex {
    urls: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns `true` when the url was not present and has now been recorded.
    pub fn insert_if_absent(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    pub fn remove(&mut self, url: &str) -> bool {
        self.urls.remove(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for DedupIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().map(|url| url.as_ref().to_string()).collect(),
        }
    }
}
