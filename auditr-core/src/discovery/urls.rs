//! Origin scoping, URL normalization and the bounded discovered set.

use std::collections::HashSet;

use url::{Origin, Url};

const ASSET_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "jpg", "jpeg", "png", "gif", "svg", "doc", "docx", "xls",
    "xlsx", "css", "js", "woff", "woff2", "ttf", "eot", "ico",
];

/// The single origin an audit is allowed to visit.
#[derive(Debug, Clone)]
pub struct SiteScope {
    base: Url,
    origin: Origin,
}

impl SiteScope {
    /// Scope to the origin of `start_url`.
    pub fn new(start_url: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(start_url)?;
        let origin = base.origin();
        Ok(Self { base, origin })
    }

    /// Serialized origin, e.g. `https://site.test`.
    pub fn origin(&self) -> String {
        self.origin.ascii_serialization()
    }

    /// Normalize to origin + path. Cross-origin, unparsable and asset URLs
    /// yield `None`.
    pub fn clean(&self, raw: &str) -> Option<String> {
        let url = self.base.join(raw.trim()).ok()?;
        if url.origin() != self.origin || is_asset_path(url.path()) {
            return None;
        }
        Some(format!("{}{}", self.origin(), url.path()))
    }

    /// Like [`clean`](Self::clean) but also rejects in-page fragment links.
    pub fn clean_link(&self, raw: &str) -> Option<String> {
        let url = self.base.join(raw.trim()).ok()?;
        if url.fragment().is_some_and(|fragment| !fragment.is_empty()) {
            return None;
        }
        self.clean(url.as_str())
    }

    /// Resolve a configured extra page (absolute, or a path relative to the
    /// site origin).
    pub fn resolve_extra(&self, page: &str) -> Option<String> {
        let page = page.trim();
        if page.is_empty() {
            return None;
        }
        if page.starts_with("http://") || page.starts_with("https://") {
            return self.clean(page);
        }
        let path = if page.starts_with('/') {
            page.to_string()
        } else {
            format!("/{page}")
        };
        self.clean(&format!("{}{}", self.origin(), path))
    }
}

fn is_asset_path(path: &str) -> bool {
    let Some(last) = path.rsplit('/').next() else {
        return false;
    };
    match last.rsplit_once('.') {
        Some((_, ext)) => ASSET_EXTENSIONS
            .iter()
            .any(|asset| asset.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Insertion-ordered, budget-capped set of discovered URLs.
#[derive(Debug, Clone)]
pub struct DiscoveredSet {
    urls: Vec<String>,
    keys: HashSet<String>,
    budget: usize,
}

impl DiscoveredSet {
    /// An empty set that accepts at most `budget` URLs.
    pub fn new(budget: usize) -> Self {
        Self {
            urls: Vec::new(),
            keys: HashSet::new(),
            budget,
        }
    }

    /// Whether the budget is used up.
    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.budget
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Whether a normalized key has been seen.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Record `url` under its normalized `key`. Returns false when the key is
    /// known or the budget is exhausted.
    pub fn insert_keyed(&mut self, url: String, key: String) -> bool {
        if self.is_full() || self.keys.contains(&key) {
            return false;
        }
        self.keys.insert(key);
        self.urls.push(url);
        true
    }

    /// Record a URL that is already normalized.
    pub fn insert(&mut self, normalized: String) -> bool {
        self.insert_keyed(normalized.clone(), normalized)
    }

    /// Insert each link until the budget is hit; returns how many were new.
    pub fn extend<I>(&mut self, links: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = 0;
        for link in links {
            if self.is_full() {
                break;
            }
            if self.insert(link) {
                added += 1;
            }
        }
        added
    }

    /// Discovery order.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Consume the set, keeping discovery order.
    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> SiteScope {
        SiteScope::new("https://app.test/dashboard?tab=1").unwrap()
    }

    #[test]
    fn clean_strips_query_and_fragment() {
        assert_eq!(
            scope().clean("https://app.test/users?page=2#top").as_deref(),
            Some("https://app.test/users")
        );
        assert_eq!(
            scope().clean("/settings").as_deref(),
            Some("https://app.test/settings")
        );
    }

    #[test]
    fn clean_rejects_foreign_origins_and_assets() {
        let scope = scope();
        assert_eq!(scope.clean("https://other.test/users"), None);
        assert_eq!(scope.clean("http://app.test/users"), None);
        assert_eq!(scope.clean("https://app.test/report.PDF"), None);
        assert_eq!(scope.clean("https://app.test/static/app.js"), None);
        assert_eq!(scope.clean("mailto:someone@app.test"), None);
        assert!(scope.clean("https://app.test/v1.2/notes").is_some());
    }

    #[test]
    fn clean_link_skips_fragments() {
        let scope = scope();
        assert_eq!(scope.clean_link("https://app.test/faq#answer"), None);
        assert!(scope.clean_link("https://app.test/faq").is_some());
    }

    #[test]
    fn extras_resolve_against_origin() {
        let scope = scope();
        assert_eq!(
            scope.resolve_extra("about").as_deref(),
            Some("https://app.test/about")
        );
        assert_eq!(
            scope.resolve_extra("/contact").as_deref(),
            Some("https://app.test/contact")
        );
        assert_eq!(scope.resolve_extra("https://elsewhere.test/x"), None);
        assert_eq!(scope.resolve_extra("  "), None);
    }

    #[test]
    fn discovered_set_respects_budget() {
        let mut set = DiscoveredSet::new(3);
        assert!(set.insert("a".into()));
        assert!(!set.insert("a".into()));
        let added = set.extend(["b", "c", "d"].map(String::from));
        assert_eq!(added, 2);
        assert!(set.is_full());
        assert_eq!(set.urls(), ["a", "b", "c"]);
    }
}
