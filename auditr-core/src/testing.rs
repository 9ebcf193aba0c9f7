//! Scripted browser and checker fakes.
//!
//! A [`ScriptedSite`] describes pages (title, static links, clickable
//! regions) by URL. [`ScriptedBrowser`] launches sessions whose pages walk
//! that site: navigation, history, the navigation trap and clickable
//! measurements all answer from the script instead of a real DOM.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;

use crate::browser::{
    BrowserError, BrowserLauncher, BrowserPage, BrowserSession, LaunchOptions,
};
use crate::checker::{AccessibilityChecker, CheckerError, CheckerReport};
use crate::discovery::clickable::{ClickCandidate, MEASURE_SCRIPT, Viewport};
use crate::discovery::trap;

/// Origin + path, the key pages are scripted under.
fn page_key(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => format!("{}{}", url.origin().ascii_serialization(), url.path()),
        Err(_) => raw.to_string(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// What happens when a region is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Full page load; the history trap is lost.
    Navigate(String),
    /// Client-side route change through `history.pushState`.
    PushState(String),
    Nothing,
}

#[derive(Debug, Clone)]
pub struct ClickRegion {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub tag: String,
    pub effect: ClickEffect,
}

impl ClickRegion {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            text: String::new(),
            tag: "div".into(),
            effect: ClickEffect::Nothing,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn pushes(mut self, url: impl Into<String>) -> Self {
        self.effect = ClickEffect::PushState(url.into());
        self
    }

    pub fn navigates(mut self, url: impl Into<String>) -> Self {
        self.effect = ClickEffect::Navigate(url.into());
        self
    }

    fn hit(&self, x: f64, y: f64) -> bool {
        x >= self.left
            && x <= self.left + self.width
            && y >= self.top
            && y <= self.top + self.height
    }

    fn candidate(&self) -> ClickCandidate {
        ClickCandidate {
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
            text: self.text.clone(),
            tag: self.tag.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageScript {
    pub title: String,
    /// Hrefs as written in the markup; resolved against the page URL.
    pub links: Vec<String>,
    pub regions: Vec<ClickRegion>,
}

impl PageScript {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn link(mut self, href: impl Into<String>) -> Self {
        self.links.push(href.into());
        self
    }

    pub fn region(mut self, region: ClickRegion) -> Self {
        self.regions.push(region);
        self
    }
}

/// The scripted web site every page of a [`ScriptedBrowser`] navigates.
#[derive(Debug, Clone)]
pub struct ScriptedSite {
    pages: HashMap<String, PageScript>,
    failing: HashSet<String>,
    viewport: Viewport,
    back_disabled: bool,
}

impl Default for ScriptedSite {
    fn default() -> Self {
        Self {
            pages: HashMap::new(),
            failing: HashSet::new(),
            viewport: Viewport {
                width: 1280.0,
                height: 720.0,
            },
            back_disabled: false,
        }
    }
}

impl ScriptedSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, script: PageScript) -> Self {
        self.pages.insert(page_key(url), script);
        self
    }

    /// Navigating to `url` fails with a navigation error.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(page_key(url));
        self
    }

    /// Every `go_back` fails, as on pages that replace their history entry.
    pub fn without_back_navigation(mut self) -> Self {
        self.back_disabled = true;
        self
    }

    fn script(&self, url: &str) -> Option<&PageScript> {
        self.pages.get(&page_key(url))
    }

    fn fails(&self, url: &str) -> bool {
        self.failing.contains(&page_key(url))
    }
}

#[derive(Debug, Default)]
struct PageState {
    current: Option<String>,
    history: Vec<String>,
    armed: bool,
    last_navigation: Option<String>,
    clicks: Vec<(f64, f64)>,
    visits: Vec<String>,
}

/// A page walking a [`ScriptedSite`].
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    site: Arc<ScriptedSite>,
    state: Arc<Mutex<PageState>>,
}

impl ScriptedPage {
    pub fn new(site: Arc<ScriptedSite>) -> Self {
        Self {
            site,
            state: Arc::new(Mutex::new(PageState::default())),
        }
    }

    /// Every URL successfully loaded with `goto`, in order.
    pub fn visits(&self) -> Vec<String> {
        lock(&self.state).visits.clone()
    }

    pub fn clicks(&self) -> Vec<(f64, f64)> {
        lock(&self.state).clicks.clone()
    }

    fn current(&self) -> Option<String> {
        lock(&self.state).current.clone()
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let base = self.current()?;
        Url::parse(&base)
            .ok()?
            .join(href)
            .ok()
            .map(|url| url.to_string())
    }

    fn load(state: &mut PageState, url: String) {
        state.current = Some(url.clone());
        state.history.push(url);
        state.armed = false;
        state.last_navigation = None;
    }

    fn collect_links(&self) -> Value {
        let Some(current) = self.current() else {
            return json!([]);
        };
        let links: Vec<String> = self
            .site
            .script(&current)
            .map(|script| {
                script.links
                    .iter()
                    .filter_map(|href| self.resolve(href))
                    .collect()
            })
            .unwrap_or_default();
        json!(links)
    }

    fn measure(&self) -> Value {
        let candidates: Vec<ClickCandidate> = self
            .current()
            .and_then(|current| self.site.script(&current).cloned())
            .map(|script| script.regions.iter().map(ClickRegion::candidate).collect())
            .unwrap_or_default();
        json!({ "viewport": self.site.viewport, "candidates": candidates })
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        if self.site.fails(url) {
            return Err(BrowserError::navigation(url, "net::ERR_CONNECTION_REFUSED"));
        }
        let mut state = lock(&self.state);
        Self::load(&mut state, url.to_string());
        state.visits.push(url.to_string());
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        if expression == trap::INSTALL_TRAP {
            lock(&self.state).armed = true;
            return Ok(Value::Bool(true));
        }
        if expression == trap::RESET_TRAP {
            lock(&self.state).last_navigation = None;
            return Ok(Value::Bool(true));
        }
        if expression == trap::TAKE_LAST_NAVIGATION {
            let last = lock(&self.state).last_navigation.take();
            return Ok(last.map(Value::String).unwrap_or(Value::Null));
        }
        if expression == trap::COLLECT_LINKS {
            return Ok(self.collect_links());
        }
        if expression == MEASURE_SCRIPT {
            return Ok(self.measure());
        }
        if expression.contains("window.scrollTo") {
            return Ok(json!(0));
        }
        if expression.contains("MutationObserver") {
            return Ok(Value::Bool(true));
        }
        Err(BrowserError::Script(format!(
            "unscripted expression: {}",
            expression.chars().take(40).collect::<String>()
        )))
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), BrowserError> {
        let current = self.current().ok_or(BrowserError::Closed)?;
        lock(&self.state).clicks.push((x, y));

        let effect = self.site.script(&current).and_then(|script| {
            script.regions
                .iter()
                .filter(|region| region.hit(x, y))
                .min_by(|a, b| (a.width * a.height).total_cmp(&(b.width * b.height)))
                .map(|region| region.effect.clone())
        });

        match effect {
            Some(ClickEffect::Navigate(href)) => {
                if let Some(url) = self.resolve(&href) {
                    Self::load(&mut lock(&self.state), url);
                }
            }
            Some(ClickEffect::PushState(href)) => {
                if let Some(url) = self.resolve(&href) {
                    let mut state = lock(&self.state);
                    state.current = Some(url.clone());
                    state.history.push(url.clone());
                    if state.armed {
                        state.last_navigation = Some(url);
                    }
                }
            }
            Some(ClickEffect::Nothing) | None => {}
        }
        Ok(())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        let current = self.current().ok_or(BrowserError::Closed)?;
        Ok(self
            .site
            .script(&current)
            .map(|script| script.title.clone())
            .unwrap_or_default())
    }

    async fn url(&self) -> Result<String, BrowserError> {
        Ok(self.current().unwrap_or_else(|| "about:blank".into()))
    }

    async fn go_back(&self, _timeout: Duration) -> Result<(), BrowserError> {
        if self.site.back_disabled {
            return Err(BrowserError::Navigation {
                url: "about:back".into(),
                reason: "history entry unavailable".into(),
            });
        }
        let mut state = lock(&self.state);
        if state.history.len() < 2 {
            return Err(BrowserError::Navigation {
                url: "about:back".into(),
                reason: "no history entry".into(),
            });
        }
        state.history.pop();
        state.current = state.history.last().cloned();
        state.armed = false;
        state.last_navigation = None;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// Counters shared by every session a [`ScriptedBrowser`] launches.
#[derive(Debug, Default)]
pub struct BrowserLog {
    launches: Mutex<Vec<LaunchOptions>>,
    closes: AtomicUsize,
    pages: Mutex<Vec<ScriptedPage>>,
}

impl BrowserLog {
    pub fn launches(&self) -> Vec<LaunchOptions> {
        lock(&self.launches).clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Pages opened so far, oldest first.
    pub fn pages(&self) -> Vec<ScriptedPage> {
        lock(&self.pages).clone()
    }
}

/// Launcher producing sessions over one [`ScriptedSite`].
#[derive(Debug, Clone)]
pub struct ScriptedBrowser {
    site: Arc<ScriptedSite>,
    log: Arc<BrowserLog>,
    fail_launch: bool,
}

impl ScriptedBrowser {
    pub fn new(site: ScriptedSite) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(BrowserLog::default()),
            fail_launch: false,
        }
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn log(&self) -> Arc<BrowserLog> {
        Arc::clone(&self.log)
    }

    pub fn site(&self) -> Arc<ScriptedSite> {
        Arc::clone(&self.site)
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedBrowser {
    async fn launch(
        &self,
        options: LaunchOptions,
    ) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if self.fail_launch {
            return Err(BrowserError::Launch("scripted launch failure".into()));
        }
        lock(&self.log.launches).push(options);
        Ok(Box::new(ScriptedSession {
            site: Arc::clone(&self.site),
            log: Arc::clone(&self.log),
            closed: false,
        }))
    }
}

#[derive(Debug)]
struct ScriptedSession {
    site: Arc<ScriptedSite>,
    log: Arc<BrowserLog>,
    closed: bool,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        let page = ScriptedPage::new(Arc::clone(&self.site));
        lock(&self.log.pages).push(page.clone());
        Ok(Box::new(page))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.log.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Checker returning canned reports keyed by page URL.
#[derive(Debug, Default)]
pub struct StaticChecker {
    reports: HashMap<String, CheckerReport>,
    fallback: CheckerReport,
    failing: HashSet<String>,
    tags_seen: Mutex<Vec<Vec<String>>>,
}

impl StaticChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(mut self, url: &str, report: CheckerReport) -> Self {
        self.reports.insert(page_key(url), report);
        self
    }

    /// Report used for pages without a specific entry.
    pub fn fallback(mut self, report: CheckerReport) -> Self {
        self.fallback = report;
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(page_key(url));
        self
    }

    pub fn tags_seen(&self) -> Vec<Vec<String>> {
        lock(&self.tags_seen).clone()
    }
}

#[async_trait]
impl AccessibilityChecker for StaticChecker {
    async fn analyze(
        &self,
        page: &dyn BrowserPage,
        tags: &[String],
    ) -> Result<CheckerReport, CheckerError> {
        lock(&self.tags_seen).push(tags.to_vec());
        let key = page_key(&page.url().await?);
        if self.failing.contains(&key) {
            return Err(CheckerError::Run(format!("scripted checker failure on {key}")));
        }
        Ok(self
            .reports
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
