//! Per-page navigation and rule checking.

use std::sync::Arc;
use std::time::Duration;

use auditr_model::PageResult;
use tracing::{debug, warn};

use crate::browser::BrowserPage;
use crate::checker::{AccessibilityChecker, RuleFinding};
use crate::discovery::StabilityDetector;

/// Rule outcomes of one page, tagged with the page they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFindings {
    /// Page the findings came from.
    pub page_url: String,
    /// Rules that failed.
    pub violations: Vec<RuleFinding>,
    /// Rules that passed.
    pub passes: Vec<RuleFinding>,
    /// Rules with nothing to check.
    pub inapplicable: Vec<RuleFinding>,
}

impl PageFindings {
    /// No findings; used for pages that failed.
    pub fn empty(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            ..Default::default()
        }
    }
}

/// Outcome of scanning one page.
#[derive(Debug, Clone)]
pub struct PageScan {
    /// Row stored on the audit.
    pub result: PageResult,
    /// Raw rule outcomes fed to aggregation.
    pub findings: PageFindings,
}

/// Navigates to one URL and runs the accessibility checker on it.
#[derive(Clone)]
pub struct PageScanner {
    checker: Arc<dyn AccessibilityChecker>,
    stability: Arc<dyn StabilityDetector>,
    navigation_timeout: Duration,
    settle_ceiling: Duration,
    rule_tags: Vec<String>,
}

impl std::fmt::Debug for PageScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageScanner")
            .field("navigation_timeout", &self.navigation_timeout)
            .field("settle_ceiling", &self.settle_ceiling)
            .field("rule_tags", &self.rule_tags)
            .finish_non_exhaustive()
    }
}

impl PageScanner {
    /// Create an empty instance.
    pub fn new(
        checker: Arc<dyn AccessibilityChecker>,
        stability: Arc<dyn StabilityDetector>,
        navigation_timeout: Duration,
        settle_ceiling: Duration,
        rule_tags: Vec<String>,
    ) -> Self {
        Self {
            checker,
            stability,
            navigation_timeout,
            settle_ceiling,
            rule_tags,
        }
    }

    /// Scan `url`. Failures become an `error` page result; they never abort
    /// the caller.
    pub async fn scan(&self, page: &dyn BrowserPage, url: &str) -> PageScan {
        debug!(url = %url, "scanning page");

        if let Err(err) = page.goto(url, self.navigation_timeout).await {
            warn!(url = %url, error = %err, "page navigation failed");
            return Self::failed(url, err.to_string());
        }

        self.stability.wait_for_settle(page, self.settle_ceiling).await;

        let title = match page.title().await {
            Ok(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => url.to_string(),
        };

        let report = match self.checker.analyze(page, &self.rule_tags).await {
            Ok(report) => report,
            Err(err) => {
                warn!(url = %url, error = %err, "accessibility check failed");
                return Self::failed(url, err.to_string());
            }
        };

        debug!(
            url = %url,
            violations = report.violations.len(),
            passes = report.passes.len(),
            "page scanned"
        );

        PageScan {
            result: PageResult::success(
                url,
                title,
                report.violations.len(),
                report.passes.len(),
            ),
            findings: PageFindings {
                page_url: url.to_string(),
                violations: report.violations,
                passes: report.passes,
                inapplicable: report.inapplicable,
            },
        }
    }

    fn failed(url: &str, message: String) -> PageScan {
        PageScan {
            result: PageResult::failed(url, message),
            findings: PageFindings::empty(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use auditr_config::constants::DEFAULT_RULE_TAGS;
    use auditr_model::PageStatus;

    use super::*;
    use crate::checker::CheckerReport;
    use crate::discovery::MutationStabilityDetector;
    use crate::testing::{PageScript, ScriptedPage, ScriptedSite, StaticChecker};

    const HOME: &str = "https://site.test/";

    fn scanner(checker: Arc<StaticChecker>) -> PageScanner {
        PageScanner::new(
            checker,
            Arc::new(MutationStabilityDetector::default()),
            Duration::from_secs(30),
            Duration::from_secs(5),
            DEFAULT_RULE_TAGS.iter().map(|tag| tag.to_string()).collect(),
        )
    }

    fn finding(id: &str) -> RuleFinding {
        RuleFinding {
            id: id.into(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn counts_findings_and_sends_the_rule_tags() {
        let page = ScriptedPage::new(Arc::new(
            ScriptedSite::new().page(HOME, PageScript::titled("  Home  ")),
        ));
        let checker = Arc::new(StaticChecker::new().fallback(CheckerReport {
            violations: vec![finding("image-alt"), finding("label")],
            passes: vec![finding("document-title")],
            inapplicable: vec![finding("video-caption")],
        }));

        let scan = scanner(checker.clone()).scan(&page, HOME).await;

        assert_eq!(scan.result.status, PageStatus::Success);
        assert_eq!(scan.result.title, "Home");
        assert_eq!(scan.result.violations_count, 2);
        assert_eq!(scan.result.passes_count, 1);
        assert_eq!(scan.findings.page_url, HOME);
        assert_eq!(scan.findings.inapplicable.len(), 1);
        assert_eq!(
            checker.tags_seen(),
            vec![vec!["wcag2a", "wcag2aa", "wcag21a", "wcag21aa", "best-practice"]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn blank_title_falls_back_to_url() {
        let page = ScriptedPage::new(Arc::new(
            ScriptedSite::new().page(HOME, PageScript::titled("   ")),
        ));

        let scan = scanner(Arc::new(StaticChecker::new())).scan(&page, HOME).await;

        assert_eq!(scan.result.status, PageStatus::Success);
        assert_eq!(scan.result.title, HOME);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_failure_yields_error_page() {
        let page = ScriptedPage::new(Arc::new(ScriptedSite::new().failing(HOME)));
        let checker = Arc::new(StaticChecker::new());

        let scan = scanner(checker.clone()).scan(&page, HOME).await;

        assert_eq!(scan.result.status, PageStatus::Error);
        assert_eq!(scan.result.title, HOME);
        assert_eq!(scan.result.violations_count, 0);
        assert_eq!(scan.result.passes_count, 0);
        assert!(
            scan.result
                .error_message
                .is_some_and(|msg| msg.contains("ERR_CONNECTION_REFUSED"))
        );
        assert_eq!(scan.findings, PageFindings::empty(HOME));
        assert!(checker.tags_seen().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn checker_failure_yields_error_page() {
        let page = ScriptedPage::new(Arc::new(
            ScriptedSite::new().page(HOME, PageScript::titled("Home")),
        ));
        let checker = StaticChecker::new()
            .fallback(CheckerReport {
                violations: vec![finding("image-alt")],
                ..Default::default()
            })
            .failing(HOME);

        let scan = scanner(Arc::new(checker)).scan(&page, HOME).await;

        assert_eq!(scan.result.status, PageStatus::Error);
        assert_eq!(scan.result.violations_count, 0);
        assert!(
            scan.result
                .error_message
                .is_some_and(|msg| msg.contains("scripted checker failure"))
        );
        assert!(scan.findings.violations.is_empty());
    }
}
