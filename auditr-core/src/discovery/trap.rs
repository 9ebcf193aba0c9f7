//! In-page history hooks that record client-side navigations.

use serde_json::Value;

use crate::browser::{BrowserError, BrowserPage};

pub(crate) const INSTALL_TRAP: &str = r#"(() => {
  if (window.__auditrNavTrapped) { return true; }
  window.__auditrNavTrapped = true;
  window.__auditrLastNav = null;
  const record = (url) => {
    try { window.__auditrLastNav = url ? new URL(url, location.href).href : location.href; }
    catch (_) { window.__auditrLastNav = location.href; }
  };
  const push = history.pushState.bind(history);
  const replace = history.replaceState.bind(history);
  history.pushState = function (data, unused, url) { record(url); return push(data, unused, url); };
  history.replaceState = function (data, unused, url) { record(url); return replace(data, unused, url); };
  window.addEventListener('popstate', () => { window.__auditrLastNav = location.href; });
  return true;
})()"#;

pub(crate) const RESET_TRAP: &str = "(() => { window.__auditrLastNav = null; return true; })()";

pub(crate) const TAKE_LAST_NAVIGATION: &str = r#"(() => {
  const last = window.__auditrLastNav || null;
  window.__auditrLastNav = null;
  return last;
})()"#;

pub(crate) const COLLECT_LINKS: &str = r#"(() => {
  const out = new Set();
  document.querySelectorAll('a[href]').forEach((a) => { if (a.href) { out.add(a.href); } });
  return Array.from(out);
})()"#;

/// Scroll so that document offset `y` sits about 300px below the top edge.
/// Evaluates to the resulting `window.scrollY`.
pub(crate) fn scroll_to(y: f64) -> String {
    format!(
        "(() => {{ window.scrollTo({{ top: Math.max(0, {:.0}), behavior: 'instant' }}); return window.scrollY; }})()",
        y - 300.0
    )
}

/// Thin wrapper over the history hooks installed in the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationTrap;

impl NavigationTrap {
    /// Idempotent; a full page load discards the hooks, so call again after
    /// every navigation.
    pub async fn arm(&self, page: &dyn BrowserPage) -> Result<(), BrowserError> {
        page.evaluate(INSTALL_TRAP).await.map(|_| ())
    }

    /// Forget the last recorded navigation.
    pub async fn reset(&self, page: &dyn BrowserPage) -> Result<(), BrowserError> {
        page.evaluate(RESET_TRAP).await.map(|_| ())
    }

    /// The last client-side navigation since the previous take, if any.
    pub async fn take(&self, page: &dyn BrowserPage) -> Option<String> {
        match page.evaluate(TAKE_LAST_NAVIGATION).await {
            Ok(Value::String(url)) if !url.is_empty() => Some(url),
            _ => None,
        }
    }
}

/// Every `a[href]` on the current page, resolved by the browser.
pub async fn collect_links(page: &dyn BrowserPage) -> Vec<String> {
    match page.evaluate(COLLECT_LINKS).await {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(href) => Some(href),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
