//! Same-origin page discovery for single-page applications.
//!
//! Discovery runs in three budget-capped phases on the audit's only page:
//! static `a[href]` harvesting, click exploration from the start page with
//! client-side navigations captured by a history trap, and a bounded second
//! hop from every first-level page. Click exploration depends on render
//! timing, so two runs over the same site may return different sets.

pub mod clickable;
pub mod stability;
pub mod trap;
pub mod urls;

use std::sync::Arc;
use std::time::Duration;

use auditr_config::AuditConfig;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::browser::{BrowserError, BrowserPage};
use crate::error::{AuditError, Result};

pub use clickable::{ClickTarget, ClickableFinder, DomClickableFinder};
pub use stability::{MutationStabilityDetector, StabilityDetector};
pub use trap::NavigationTrap;
pub use urls::{DiscoveredSet, SiteScope};

const SCROLL_PAUSE: Duration = Duration::from_millis(200);

/// Bounds and pacing for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Budget shared by every phase, start URL included.
    pub max_pages: usize,
    /// Settle ceiling after a full navigation.
    pub settle_ceiling: Duration,
    /// Settle ceiling after a click.
    pub click_settle_ceiling: Duration,
    /// Pause between a click and the first settle check.
    pub click_delay: Duration,
    /// Clicks tried on each first-level page.
    pub second_level_clicks: usize,
    /// Timeout of a fresh load back to the page being explored.
    pub return_navigation_timeout: Duration,
    /// Timeout of a history back step before falling back to a fresh load.
    pub back_navigation_timeout: Duration,
}

impl From<&AuditConfig> for DiscoverySettings {
    fn from(config: &AuditConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            settle_ceiling: config.settle_ceiling,
            click_settle_ceiling: config.click_settle_ceiling,
            click_delay: config.click_delay,
            second_level_clicks: config.second_level_clicks,
            return_navigation_timeout: config.return_navigation_timeout,
            back_navigation_timeout: config.back_navigation_timeout,
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self::from(&AuditConfig::default())
    }
}

/// Three-phase page discovery: static links, clicks on the start page,
/// then a second hop from each first-level page.
#[derive(Clone)]
pub struct PageDiscovery {
    settings: DiscoverySettings,
    stability: Arc<dyn StabilityDetector>,
    clickables: Arc<dyn ClickableFinder>,
    trap: NavigationTrap,
}

impl std::fmt::Debug for PageDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageDiscovery")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PageDiscovery {
    /// Create an empty instance.
    pub fn new(
        settings: DiscoverySettings,
        stability: Arc<dyn StabilityDetector>,
        clickables: Arc<dyn ClickableFinder>,
    ) -> Self {
        Self {
            settings,
            stability,
            clickables,
            trap: NavigationTrap,
        }
    }

    /// Settings this discovery runs with.
    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Discover up to `max_pages` URLs starting from the page currently
    /// loaded at `start_url`.
    ///
    /// The result always starts with `start_url`, followed by the project's
    /// extra pages and then discovered routes, all normalized to origin +
    /// path. Per-click and per-page failures are logged and skipped.
    pub async fn discover(
        &self,
        page: &dyn BrowserPage,
        start_url: &str,
        extra_pages: &[String],
    ) -> Result<Vec<String>> {
        let scope = SiteScope::new(start_url).map_err(|err| {
            AuditError::Navigation(format!("invalid start url {start_url}: {err}"))
        })?;

        let mut found = DiscoveredSet::new(self.settings.max_pages.max(1));
        let start_key = scope
            .clean(start_url)
            .unwrap_or_else(|| start_url.to_string());
        found.insert_keyed(start_url.to_string(), start_key);

        for extra in extra_pages {
            match scope.resolve_extra(extra) {
                Some(resolved) => {
                    found.insert(resolved);
                }
                None => warn!(page = %extra, "ignoring extra page outside the audited origin"),
            }
        }

        self.trap.arm(page).await?;

        let links = self.harvest(page, &scope).await;
        found.extend(links);
        info!(phase = "links", pages = found.len(), "static links collected");

        if !found.is_full() {
            self.explore_start(page, &scope, &mut found, start_url).await;
            info!(phase = "clicks", pages = found.len(), "click exploration finished");
        }

        if !found.is_full() {
            self.explore_second_level(page, &scope, &mut found, start_url)
                .await;
            info!(phase = "second-level", pages = found.len(), "second-level exploration finished");
        }

        info!(pages = found.len(), "page discovery finished");
        Ok(found.into_urls())
    }

    async fn harvest(&self, page: &dyn BrowserPage, scope: &SiteScope) -> Vec<String> {
        trap::collect_links(page)
            .await
            .into_iter()
            .filter_map(|link| scope.clean_link(&link))
            .collect()
    }

    async fn explore_start(
        &self,
        page: &dyn BrowserPage,
        scope: &SiteScope,
        found: &mut DiscoveredSet,
        start_url: &str,
    ) {
        let start_page = page.url().await.unwrap_or_else(|_| start_url.to_string());
        let start_clean = scope.clean(&start_page);

        let targets = match self.clickables.find(page).await {
            Ok(targets) => targets,
            Err(err) => {
                warn!(error = %err, "could not measure clickable elements");
                return;
            }
        };
        info!(candidates = targets.len(), "exploring clickable elements");

        for target in &targets {
            if found.is_full() {
                break;
            }
            if let Err(err) = self
                .click_from_start(page, scope, found, target, &start_page, start_clean.as_deref())
                .await
            {
                warn!(error = %err, text = %target.text, tag = %target.tag, "click exploration failed");
            }
        }
    }

    async fn click_from_start(
        &self,
        page: &dyn BrowserPage,
        scope: &SiteScope,
        found: &mut DiscoveredSet,
        target: &ClickTarget,
        start_page: &str,
        start_clean: Option<&str>,
    ) -> std::result::Result<(), BrowserError> {
        let current = page.url().await?;
        if scope.clean(&current).as_deref() != start_clean {
            debug!(url = %start_page, "returning to exploration start");
            page.goto(start_page, self.settings.return_navigation_timeout)
                .await?;
            self.stability
                .wait_for_settle(page, self.settings.settle_ceiling)
                .await;
            self.trap.arm(page).await?;
        }

        let landed = self.click_and_observe(page, target).await?;
        let Some(cleaned) = scope.clean(&landed) else {
            return Ok(());
        };
        if Some(cleaned.as_str()) == start_clean {
            return Ok(());
        }
        if found.contains(&cleaned) {
            debug!(url = %cleaned, "click led to a known page");
            return Ok(());
        }

        if found.insert(cleaned.clone()) {
            info!(url = %cleaned, "discovered client-side route");
            self.trap.arm(page).await?;
            let links = self.harvest(page, scope).await;
            found.extend(links);
        }
        Ok(())
    }

    async fn explore_second_level(
        &self,
        page: &dyn BrowserPage,
        scope: &SiteScope,
        found: &mut DiscoveredSet,
        start_url: &str,
    ) {
        let first_level: Vec<String> = found.urls().to_vec();
        for url in first_level.iter().filter(|url| url.as_str() != start_url) {
            if found.is_full() {
                break;
            }
            if let Err(err) = self.explore_page(page, scope, found, url).await {
                warn!(url = %url, error = %err, "second-level exploration failed");
            }
        }
    }

    async fn explore_page(
        &self,
        page: &dyn BrowserPage,
        scope: &SiteScope,
        found: &mut DiscoveredSet,
        url: &str,
    ) -> std::result::Result<(), BrowserError> {
        page.goto(url, self.settings.return_navigation_timeout).await?;
        self.stability
            .wait_for_settle(page, self.settings.settle_ceiling)
            .await;
        self.trap.arm(page).await?;

        let links = self.harvest(page, scope).await;
        found.extend(links);

        let targets = self.clickables.find(page).await?;
        for target in targets.iter().take(self.settings.second_level_clicks) {
            if found.is_full() {
                break;
            }
            if let Err(err) = self.nested_click(page, scope, found, url, target).await {
                debug!(url = %url, error = %err, "second-level click failed");
            }
        }
        Ok(())
    }

    async fn nested_click(
        &self,
        page: &dyn BrowserPage,
        scope: &SiteScope,
        found: &mut DiscoveredSet,
        origin_page: &str,
        target: &ClickTarget,
    ) -> std::result::Result<(), BrowserError> {
        let before = scope.clean(&page.url().await?);
        let landed = self.click_and_observe(page, target).await?;
        let after = scope.clean(&landed);

        if after == before {
            return Ok(());
        }
        if let Some(after_url) = after
            && found.insert(after_url.clone())
        {
            info!(url = %after_url, from = %origin_page, "discovered second-level route");
        }

        self.return_to(page, origin_page).await
    }

    async fn return_to(
        &self,
        page: &dyn BrowserPage,
        url: &str,
    ) -> std::result::Result<(), BrowserError> {
        if let Err(err) = page.go_back(self.settings.back_navigation_timeout).await {
            debug!(url = %url, error = %err, "back navigation failed; reloading");
            page.goto(url, self.settings.return_navigation_timeout).await?;
        }
        self.stability
            .wait_for_settle(page, self.settings.click_settle_ceiling)
            .await;
        self.trap.arm(page).await
    }

    /// Click the target's center and report where the page ended up: the
    /// trapped client-side URL if any, else the page URL.
    async fn click_and_observe(
        &self,
        page: &dyn BrowserPage,
        target: &ClickTarget,
    ) -> std::result::Result<String, BrowserError> {
        let scrolled = match page.evaluate(&trap::scroll_to(target.y)).await? {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            _ => 0.0,
        };
        tokio::time::sleep(SCROLL_PAUSE).await;
        self.trap.reset(page).await?;

        debug!(
            text = %target.text,
            tag = %target.tag,
            width = target.width.round() as i64,
            height = target.height.round() as i64,
            "clicking candidate"
        );
        page.click_at(target.x, target.y - scrolled).await?;

        tokio::time::sleep(self.settings.click_delay).await;
        self.stability
            .wait_for_settle(page, self.settings.click_settle_ceiling)
            .await;

        match self.trap.take(page).await {
            Some(url) => Ok(url),
            None => page.url().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ClickRegion, PageScript, ScriptedPage, ScriptedSite};

    const START: &str = "https://site.test/";

    fn spa_site() -> ScriptedSite {
        ScriptedSite::new()
            .page(
                START,
                PageScript::titled("Home")
                    .link("/about")
                    .link("https://other.test/x")
                    .link("/brochure.pdf")
                    .link("#top")
                    .link("/about?ref=nav")
                    .region(
                        ClickRegion::new(100.0, 100.0, 300.0, 80.0)
                            .text("Dashboard")
                            .pushes("/app/dashboard"),
                    )
                    .region(
                        ClickRegion::new(100.0, 300.0, 200.0, 50.0)
                            .text("Contact")
                            .tag("a")
                            .navigates("/contact"),
                    ),
            )
            .page("https://site.test/about", PageScript::titled("About"))
            .page(
                "https://site.test/app/dashboard",
                PageScript::titled("Dashboard").region(
                    ClickRegion::new(100.0, 100.0, 240.0, 60.0)
                        .text("Settings")
                        .pushes("/app/settings"),
                ),
            )
            .page("https://site.test/contact", PageScript::titled("Contact"))
            .page("https://site.test/app/settings", PageScript::titled("Settings"))
    }

    fn discovery(max_pages: usize) -> PageDiscovery {
        let settings = DiscoverySettings {
            max_pages,
            ..DiscoverySettings::default()
        };
        PageDiscovery::new(
            settings,
            Arc::new(MutationStabilityDetector::default()),
            Arc::new(DomClickableFinder),
        )
    }

    async fn opened(site: ScriptedSite) -> ScriptedPage {
        let page = ScriptedPage::new(Arc::new(site));
        page.goto(START, Duration::from_secs(30)).await.unwrap();
        page
    }

    #[tokio::test(start_paused = true)]
    async fn finds_links_spa_routes_and_second_hop() {
        let page = opened(spa_site()).await;
        let urls = discovery(20).discover(&page, START, &[]).await.unwrap();

        assert_eq!(
            urls,
            vec![
                "https://site.test/",
                "https://site.test/about",
                "https://site.test/app/dashboard",
                "https://site.test/contact",
                "https://site.test/app/settings",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn budget_caps_every_phase() {
        let page = opened(spa_site()).await;
        let urls = discovery(3).discover(&page, START, &[]).await.unwrap();

        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], START);
    }

    #[tokio::test(start_paused = true)]
    async fn stays_on_origin_and_skips_assets() {
        let page = opened(spa_site()).await;
        let urls = discovery(20).discover(&page, START, &[]).await.unwrap();

        assert!(urls.iter().all(|url| url.starts_with("https://site.test/")));
        assert!(!urls.iter().any(|url| url.ends_with(".pdf")));
        assert!(!urls.iter().any(|url| url.contains('?') || url.contains('#')));
    }

    #[tokio::test(start_paused = true)]
    async fn extra_pages_follow_the_start_url() {
        let page = opened(ScriptedSite::new().page(START, PageScript::titled("Home"))).await;
        let extras = vec![
            "/pricing".to_string(),
            "team".to_string(),
            "https://other.test/elsewhere".to_string(),
        ];
        let urls = discovery(20).discover(&page, START, &extras).await.unwrap();

        assert_eq!(
            urls,
            vec![
                "https://site.test/",
                "https://site.test/pricing",
                "https://site.test/team",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn click_returns_to_start_before_next_candidate() {
        let page = opened(spa_site()).await;
        discovery(20).discover(&page, START, &[]).await.unwrap();

        let visits = page.visits();
        // Initial load, then the return to the start page after the
        // dashboard click moved away.
        assert_eq!(&visits[..2], &[START.to_string(), START.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn reloads_origin_page_when_back_navigation_fails() {
        let site = ScriptedSite::new()
            .without_back_navigation()
            .page(START, PageScript::titled("Home").link("/docs"))
            .page(
                "https://site.test/docs",
                PageScript::titled("Docs")
                    .region(
                        ClickRegion::new(100.0, 100.0, 240.0, 60.0)
                            .text("Guide")
                            .pushes("/docs/guide"),
                    )
                    .region(
                        ClickRegion::new(100.0, 300.0, 240.0, 60.0)
                            .text("API")
                            .pushes("/docs/api"),
                    ),
            )
            .page("https://site.test/docs/guide", PageScript::titled("Guide"))
            .page("https://site.test/docs/api", PageScript::titled("API"));
        let page = opened(site).await;

        let urls = discovery(20).discover(&page, START, &[]).await.unwrap();

        assert_eq!(urls.len(), 4);
        assert!(urls.contains(&"https://site.test/docs/guide".to_string()));
        assert!(urls.contains(&"https://site.test/docs/api".to_string()));

        // One load to explore the page, then a reload after each click.
        let docs_loads = page
            .visits()
            .iter()
            .filter(|url| url.as_str() == "https://site.test/docs")
            .count();
        assert_eq!(docs_loads, 3);
    }
}
