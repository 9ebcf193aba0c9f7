//! Drives one audit from `pending` to a terminal state.
//!
//! [`AuditOrchestrator::start_audit`] validates the project, stores a
//! `pending` audit and hands the rest of the run to a background task. That
//! task owns one browser session and one page for its whole lifetime and
//! always closes the session, whatever the outcome.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use auditr_config::{AuditConfig, constants::DEFAULT_RULE_TAGS};
use auditr_model::{
    Audit, AuditId, AuditListItem, AuditStatus, AuditStatusView, Project,
    ProjectId,
};
use chrono::Utc;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use crate::aggregate::aggregate;
use crate::auth_signal::{AuthSignalError, AuthSignalRegistry};
use crate::browser::{BrowserLauncher, BrowserPage, BrowserSession, LaunchOptions};
use crate::catalog::Catalog;
use crate::checker::AccessibilityChecker;
use crate::discovery::{
    ClickableFinder, DiscoverySettings, DomClickableFinder,
    MutationStabilityDetector, PageDiscovery, StabilityDetector,
};
use crate::error::{AuditError, Result};
use crate::scanner::PageScanner;
use crate::store::{AuditStore, ProjectStore};

/// Handle to an audit that has been accepted and scheduled.
#[derive(Debug)]
pub struct AuditTicket {
    /// Id of the stored `pending` audit.
    pub audit_id: AuditId,
    /// Completes when the background run has reached a terminal state.
    pub task: JoinHandle<()>,
}

/// Starts audits and answers lifecycle queries.
///
/// Cheap to clone; every clone shares the same stores and auth registry.
#[derive(Clone)]
pub struct AuditOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    projects: Arc<dyn ProjectStore>,
    audits: Arc<dyn AuditStore>,
    launcher: Arc<dyn BrowserLauncher>,
    auth: AuthSignalRegistry,
    catalog: Catalog,
    config: AuditConfig,
    stability: Arc<dyn StabilityDetector>,
    discovery: PageDiscovery,
    scanner: PageScanner,
}

impl fmt::Debug for AuditOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditOrchestrator")
            .field("config", &self.inner.config)
            .field("criteria", &self.inner.catalog.len())
            .field("auth", &self.inner.auth)
            .finish_non_exhaustive()
    }
}

impl AuditOrchestrator {
    /// Start building an orchestrator.
    pub fn builder(config: AuditConfig) -> AuditOrchestratorBuilder {
        AuditOrchestratorBuilder::new(config)
    }

    /// Registry that `confirm_auth` resolves waiters in.
    pub fn auth_registry(&self) -> &AuthSignalRegistry {
        &self.inner.auth
    }

    /// Audit settings in use.
    pub fn config(&self) -> &AuditConfig {
        &self.inner.config
    }

    /// Create a `pending` audit for `project_id` and schedule its run.
    ///
    /// Returns as soon as the record is stored; crawling and scanning happen
    /// on a spawned task.
    #[instrument(skip_all, fields(project_id = %project_id))]
    pub async fn start_audit(&self, project_id: ProjectId) -> Result<AuditTicket> {
        let project = self
            .inner
            .projects
            .find_by_id(project_id)
            .await?
            .ok_or(AuditError::ProjectNotFound)?;

        let audit = Audit::pending(
            project.id,
            project.url.clone(),
            self.inner.catalog.initial_results(),
        );
        let audit_id = self.inner.audits.create(&audit).await?;
        info!(%audit_id, url = %project.url, "audit accepted");

        let span = info_span!(
            "audit",
            audit_id = %audit_id,
            project_id = %project.id
        );
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(
            async move { inner.run(audit, project).await }.instrument(span),
        );

        Ok(AuditTicket { audit_id, task })
    }

    /// Release an audit paused in `waiting-auth`.
    #[instrument(skip_all, fields(audit_id = %audit_id))]
    pub async fn confirm_auth(&self, audit_id: AuditId) -> Result<()> {
        let audit = self.load(audit_id).await?;
        if audit.status != AuditStatus::WaitingAuth {
            return Err(AuditError::NotAwaitingAuth);
        }
        if !self.inner.auth.confirm(audit_id) {
            return Err(AuditError::AuthNotPending);
        }
        info!("authentication confirmed");
        Ok(())
    }

    /// Current status, progress counters and error message.
    pub async fn audit_status(&self, audit_id: AuditId) -> Result<AuditStatusView> {
        let audit = self.load(audit_id).await?;
        Ok(AuditStatusView::from(&audit))
    }

    /// The full stored audit.
    pub async fn get_audit(&self, audit_id: AuditId) -> Result<Audit> {
        self.load(audit_id).await
    }

    /// Audits of one project, newest first, without criteria or findings.
    pub async fn list_audits(&self, project_id: ProjectId) -> Result<Vec<AuditListItem>> {
        if self.inner.projects.find_by_id(project_id).await?.is_none() {
            return Err(AuditError::ProjectNotFound);
        }
        let audits = self.inner.audits.list_for_project(project_id).await?;
        Ok(audits.iter().map(AuditListItem::from).collect())
    }

    /// Delete a finished audit. Running or paused audits are refused.
    #[instrument(skip_all, fields(audit_id = %audit_id))]
    pub async fn delete_audit(&self, audit_id: AuditId) -> Result<()> {
        let audit = self.load(audit_id).await?;
        if !audit.status.is_terminal() {
            return Err(AuditError::AuditInProgress);
        }
        if !self.inner.audits.delete(audit_id).await? {
            return Err(AuditError::AuditNotFound);
        }
        Ok(())
    }

    async fn load(&self, audit_id: AuditId) -> Result<Audit> {
        self.inner
            .audits
            .load(audit_id)
            .await?
            .ok_or(AuditError::AuditNotFound)
    }
}

impl Inner {
    async fn run(&self, mut audit: Audit, project: Project) {
        match self.drive(&mut audit, &project).await {
            Ok(()) => {}
            Err(err) => {
                error!(error = %err, "audit failed");
                if audit.status.is_terminal() {
                    return;
                }
                if let Err(fail_err) = audit.fail(err.to_string(), Utc::now()) {
                    warn!(error = %fail_err, "could not mark audit as failed");
                    return;
                }
                if let Err(save_err) = self.audits.save(&audit).await {
                    error!(error = %save_err, "could not persist failed audit");
                }
            }
        }
    }

    async fn drive(&self, audit: &mut Audit, project: &Project) -> Result<()> {
        self.advance(audit, AuditStatus::Running).await?;

        let headless = !project.requires_auth();
        let mut session = self.launcher.launch(LaunchOptions { headless }).await?;
        debug!(headless, "browser launched");

        let outcome =
            AssertUnwindSafe(self.with_session(session.as_mut(), audit, project))
                .catch_unwind()
                .await;

        if let Err(err) = session.close().await {
            warn!(error = %err, "failed to close browser");
        } else {
            debug!("browser closed");
        }

        outcome.unwrap_or_else(|panic| {
            Err(AuditError::internal(format!(
                "audit task panicked: {}",
                panic_message(panic.as_ref())
            )))
        })
    }

    async fn with_session(
        &self,
        session: &mut dyn BrowserSession,
        audit: &mut Audit,
        project: &Project,
    ) -> Result<()> {
        let page = session.new_page().await?;
        let result = self.audit_site(page.as_ref(), audit, project).await;
        if let Err(err) = page.close().await {
            debug!(error = %err, "failed to close page");
        }
        result
    }

    async fn audit_site(
        &self,
        page: &dyn BrowserPage,
        audit: &mut Audit,
        project: &Project,
    ) -> Result<()> {
        if project.requires_auth() {
            self.await_login(page, audit, project).await?;
        }

        page.goto(&project.url, self.config.navigation_timeout)
            .await
            .map_err(|err| AuditError::Navigation(err.to_string()))?;
        self.stability
            .wait_for_settle(page, self.config.settle_ceiling)
            .await;

        let urls = self
            .discovery
            .discover(page, &project.url, &project.pages)
            .await?;

        let mut findings = Vec::with_capacity(urls.len());
        for url in &urls {
            let scan = self.scanner.scan(page, url).await;
            audit.pages_audited.push(scan.result);
            findings.push(scan.findings);
        }

        let scanned = audit
            .pages_audited
            .iter()
            .filter(|result| result.is_success())
            .count();
        info!(pages = urls.len(), scanned, "pages scanned");

        let aggregation =
            aggregate(std::mem::take(&mut audit.criteria), &findings, scanned);
        audit.criteria = aggregation.criteria;
        audit.summary = Some(aggregation.summary);
        audit.raw_findings = aggregation.raw_findings;

        self.advance(audit, AuditStatus::Completed).await?;
        info!(
            compliance_rate = aggregation.summary.compliance_rate,
            pages = scanned,
            "audit completed"
        );
        Ok(())
    }

    /// Open the login page and park until a human confirms or the auth
    /// timeout passes. The waiter is registered before `waiting-auth` is
    /// persisted so a confirmation can never observe the status first.
    async fn await_login(
        &self,
        page: &dyn BrowserPage,
        audit: &mut Audit,
        project: &Project,
    ) -> Result<()> {
        let login_url = project.login_url();
        page.goto(login_url, self.config.navigation_timeout)
            .await
            .map_err(|err| AuditError::Navigation(err.to_string()))?;

        let timeout = self.config.auth_timeout;
        let waiter = self.auth.register_waiter(audit.id, Instant::now() + timeout);
        self.advance(audit, AuditStatus::WaitingAuth).await?;
        info!(
            login_url = %login_url,
            timeout = %humantime::format_duration(timeout),
            "waiting for interactive login"
        );

        match waiter.wait().await {
            Ok(()) => {}
            Err(AuthSignalError::Timeout) => return Err(AuditError::AuthTimeout(timeout)),
            Err(AuthSignalError::Superseded) => {
                return Err(AuditError::internal("authentication wait superseded"));
            }
        }

        self.advance(audit, AuditStatus::Running).await
    }

    /// Apply a status transition and persist it so pollers see progress.
    /// The in-memory audit only moves once the store has accepted it.
    async fn advance(&self, audit: &mut Audit, next: AuditStatus) -> Result<()> {
        let from = audit.status;
        let mut updated = audit.clone();
        updated.transition(next, Utc::now())?;
        self.audits.save(&updated).await?;
        *audit = updated;
        debug!(from = %from, to = %next, "audit status changed");
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Collects the orchestrator's collaborators.
///
/// Stores, launcher and checker are required. Everything else falls back to
/// the production heuristics configured from [`AuditConfig`].
pub struct AuditOrchestratorBuilder {
    config: AuditConfig,
    projects: Option<Arc<dyn ProjectStore>>,
    audits: Option<Arc<dyn AuditStore>>,
    launcher: Option<Arc<dyn BrowserLauncher>>,
    checker: Option<Arc<dyn AccessibilityChecker>>,
    auth: Option<AuthSignalRegistry>,
    catalog: Option<Catalog>,
    rule_tags: Option<Vec<String>>,
    stability: Option<Arc<dyn StabilityDetector>>,
    clickables: Option<Arc<dyn ClickableFinder>>,
}

impl fmt::Debug for AuditOrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditOrchestratorBuilder")
            .field("config", &self.config)
            .field("projects", &self.projects.is_some())
            .field("audits", &self.audits.is_some())
            .field("launcher", &self.launcher.is_some())
            .field("checker", &self.checker.is_some())
            .field("auth", &self.auth.is_some())
            .field("catalog", &self.catalog.is_some())
            .field("rule_tags", &self.rule_tags)
            .field("stability", &self.stability.is_some())
            .field("clickables", &self.clickables.is_some())
            .finish()
    }
}

impl AuditOrchestratorBuilder {
    /// Create an empty instance.
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            projects: None,
            audits: None,
            launcher: None,
            checker: None,
            auth: None,
            catalog: None,
            rule_tags: None,
            stability: None,
            clickables: None,
        }
    }

    /// Set the projects dependency.
    pub fn with_projects(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.projects = Some(store);
        self
    }

    /// Set the audits dependency.
    pub fn with_audits(mut self, store: Arc<dyn AuditStore>) -> Self {
        self.audits = Some(store);
        self
    }

    /// Browser backend; one session is launched per audit.
    pub fn with_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Set the checker dependency.
    pub fn with_checker(mut self, checker: Arc<dyn AccessibilityChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Share a registry with other components. Defaults to a fresh one.
    pub fn with_auth_registry(mut self, registry: AuthSignalRegistry) -> Self {
        self.auth = Some(registry);
        self
    }

    /// Defaults to the RGAA 4.1 catalog.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Defaults to the WCAG 2.1 A/AA tags plus best practices.
    pub fn with_rule_tags(mut self, tags: Vec<String>) -> Self {
        self.rule_tags = Some(tags);
        self
    }

    /// Set the stability dependency.
    pub fn with_stability(mut self, detector: Arc<dyn StabilityDetector>) -> Self {
        self.stability = Some(detector);
        self
    }

    /// Set the clickables dependency.
    pub fn with_clickables(mut self, finder: Arc<dyn ClickableFinder>) -> Self {
        self.clickables = Some(finder);
        self
    }

    /// Fails when a store, the launcher or the checker is missing.
    pub fn build(self) -> Result<AuditOrchestrator> {
        let projects = self
            .projects
            .ok_or_else(|| AuditError::internal("project store dependency missing"))?;
        let audits = self
            .audits
            .ok_or_else(|| AuditError::internal("audit store dependency missing"))?;
        let launcher = self
            .launcher
            .ok_or_else(|| AuditError::internal("browser launcher dependency missing"))?;
        let checker = self
            .checker
            .ok_or_else(|| AuditError::internal("accessibility checker dependency missing"))?;

        let config = self.config;
        let stability = self.stability.unwrap_or_else(|| {
            Arc::new(MutationStabilityDetector::new(config.settle_quiet_window))
        });
        let clickables = self
            .clickables
            .unwrap_or_else(|| Arc::new(DomClickableFinder));
        let rule_tags = self.rule_tags.unwrap_or_else(|| {
            DEFAULT_RULE_TAGS.iter().map(|tag| tag.to_string()).collect()
        });

        let discovery = PageDiscovery::new(
            DiscoverySettings::from(&config),
            Arc::clone(&stability),
            clickables,
        );
        let scanner = PageScanner::new(
            checker,
            Arc::clone(&stability),
            config.navigation_timeout,
            config.settle_ceiling,
            rule_tags,
        );

        Ok(AuditOrchestrator {
            inner: Arc::new(Inner {
                projects,
                audits,
                launcher,
                auth: self.auth.unwrap_or_default(),
                catalog: self.catalog.unwrap_or_default(),
                config,
                stability,
                discovery,
                scanner,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use auditr_model::{
        ConformanceLevel, CriterionOutcome, CriterionResult, PageStatus,
        ProjectAuthConfig,
    };

    use super::*;
    use crate::checker::{CheckerReport, NodeExcerpt, RuleFinding};
    use crate::store::{
        InMemoryAuditStore, InMemoryProjectStore, StoreError, StoreResult,
    };
    use crate::testing::{
        BrowserLog, PageScript, ScriptedBrowser, ScriptedSite, StaticChecker,
    };

    const SITE: &str = "https://site.test/";

    struct Harness {
        orchestrator: AuditOrchestrator,
        projects: Arc<InMemoryProjectStore>,
        audits: Arc<InMemoryAuditStore>,
        log: Arc<BrowserLog>,
    }

    fn criterion(id: &str, rules: &[&str]) -> CriterionResult {
        CriterionResult {
            id: id.into(),
            theme: "Test".into(),
            title: format!("Criterion {id}"),
            level: ConformanceLevel::A,
            result: CriterionOutcome::Untested,
            details: vec![],
            rule_ids: rules.iter().map(|rule| rule.to_string()).collect(),
        }
    }

    fn rule(id: &str, nodes: usize) -> RuleFinding {
        RuleFinding {
            id: id.into(),
            impact: Some("serious".into()),
            help: format!("{id} help"),
            nodes: (0..nodes)
                .map(|n| NodeExcerpt {
                    html: format!("<div id=\"{id}-{n}\"></div>"),
                    target: vec![format!("#{id}-{n}")],
                    failure_summary: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn harness(browser: ScriptedBrowser, checker: StaticChecker) -> Harness {
        let projects = Arc::new(InMemoryProjectStore::new());
        let audits = Arc::new(InMemoryAuditStore::new());
        let log = browser.log();
        let orchestrator = AuditOrchestrator::builder(AuditConfig::default())
            .with_projects(projects.clone())
            .with_audits(audits.clone())
            .with_launcher(Arc::new(browser))
            .with_checker(Arc::new(checker))
            .with_catalog(Catalog::new(vec![
                criterion("C1", &["image-alt"]),
                criterion("C2", &["label"]),
                criterion("C3", &["document-title"]),
            ]))
            .build()
            .unwrap();
        Harness {
            orchestrator,
            projects,
            audits,
            log,
        }
    }

    async fn project(h: &Harness, auth: Option<ProjectAuthConfig>) -> Project {
        let now = Utc::now();
        let project = Project {
            id: ProjectId::new(),
            name: "Site".into(),
            description: String::new(),
            url: SITE.into(),
            auth,
            pages: vec![],
            created_at: now,
            updated_at: now,
        };
        h.projects.create(&project).await.unwrap();
        project
    }

    fn login() -> Option<ProjectAuthConfig> {
        Some(ProjectAuthConfig {
            enabled: true,
            login_url: Some("https://site.test/login".into()),
        })
    }

    async fn wait_for_status(h: &Harness, id: AuditId, status: AuditStatus) {
        for _ in 0..100 {
            if h.orchestrator.audit_status(id).await.unwrap().status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("audit never reached {status}");
    }

    #[tokio::test(start_paused = true)]
    async fn completes_without_auth_and_scores_findings() {
        let site = ScriptedSite::new().page(SITE, PageScript::titled("Home"));
        let checker = StaticChecker::new().fallback(CheckerReport {
            violations: vec![rule("image-alt", 2), rule("label", 1)],
            passes: vec![
                rule("document-title", 0),
                rule("document-title", 0),
                rule("document-title", 0),
            ],
            inapplicable: vec![],
        });
        let h = harness(ScriptedBrowser::new(site), checker);
        let project = project(&h, None).await;

        let ticket = h.orchestrator.start_audit(project.id).await.unwrap();
        ticket.task.await.unwrap();

        let audit = h.orchestrator.get_audit(ticket.audit_id).await.unwrap();
        assert_eq!(audit.status, AuditStatus::Completed);
        assert!(audit.started_at.is_some() && audit.completed_at.is_some());
        assert_eq!(audit.pages_audited.len(), 1);
        assert_eq!(audit.pages_audited[0].title, "Home");

        let summary = audit.summary.unwrap();
        assert_eq!(summary.compliant, 1);
        assert_eq!(summary.non_compliant, 2);
        assert_eq!(summary.compliance_rate, 33);
        assert_eq!(summary.pages_count, 1);
        assert_eq!(audit.raw_findings.len(), 2);

        assert_eq!(h.log.launches(), vec![LaunchOptions { headless: true }]);
        assert_eq!(h.log.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_timeout_fails_without_scanning() {
        let site = ScriptedSite::new()
            .page("https://site.test/login", PageScript::titled("Login"));
        let h = harness(ScriptedBrowser::new(site), StaticChecker::new());
        let project = project(&h, login()).await;

        let ticket = h.orchestrator.start_audit(project.id).await.unwrap();
        ticket.task.await.unwrap();

        let audit = h.orchestrator.get_audit(ticket.audit_id).await.unwrap();
        assert_eq!(audit.status, AuditStatus::Error);
        assert!(
            audit.error_message.as_deref().unwrap().contains("timed out"),
            "{:?}",
            audit.error_message
        );
        assert!(audit.pages_audited.is_empty());
        assert!(audit.completed_at.is_some());
        assert_eq!(h.log.launches(), vec![LaunchOptions { headless: false }]);
        assert_eq!(h.log.closes(), 1);
        assert_eq!(h.orchestrator.auth_registry().pending_count(), 0);
        assert!(matches!(
            h.orchestrator.confirm_auth(ticket.audit_id).await,
            Err(AuditError::NotAwaitingAuth)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_resumes_the_audit() {
        let site = ScriptedSite::new()
            .page("https://site.test/login", PageScript::titled("Login"))
            .page(SITE, PageScript::titled("Home"));
        let h = harness(ScriptedBrowser::new(site), StaticChecker::new());
        let project = project(&h, login()).await;

        let ticket = h.orchestrator.start_audit(project.id).await.unwrap();
        wait_for_status(&h, ticket.audit_id, AuditStatus::WaitingAuth).await;
        assert!(h.orchestrator.auth_registry().is_waiting(ticket.audit_id));

        h.orchestrator.confirm_auth(ticket.audit_id).await.unwrap();
        assert!(matches!(
            h.orchestrator.confirm_auth(ticket.audit_id).await,
            Err(AuditError::AuthNotPending | AuditError::NotAwaitingAuth)
        ));
        ticket.task.await.unwrap();

        let audit = h.orchestrator.get_audit(ticket.audit_id).await.unwrap();
        assert_eq!(audit.status, AuditStatus::Completed);
        assert_eq!(audit.pages_audited.len(), 1);

        let pages = h.log.pages();
        assert_eq!(pages[0].visits()[0], "https://site.test/login");
        assert_eq!(h.log.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_page_does_not_abort_the_audit() {
        let site = ScriptedSite::new()
            .page(
                SITE,
                PageScript::titled("Home").link("/a").link("/b"),
            )
            .page("https://site.test/a", PageScript::titled("A"))
            .failing("https://site.test/b");
        let h = harness(ScriptedBrowser::new(site), StaticChecker::new());
        let project = project(&h, None).await;

        let ticket = h.orchestrator.start_audit(project.id).await.unwrap();
        ticket.task.await.unwrap();

        let audit = h.orchestrator.get_audit(ticket.audit_id).await.unwrap();
        assert_eq!(audit.status, AuditStatus::Completed);
        assert_eq!(audit.pages_audited.len(), 3);
        let failed: Vec<_> = audit
            .pages_audited
            .iter()
            .filter(|page| page.status == PageStatus::Error)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].url, "https://site.test/b");
        assert_eq!(audit.summary.unwrap().pages_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn checker_failure_is_recorded_per_page() {
        let site = ScriptedSite::new().page(SITE, PageScript::titled("Home"));
        let h = harness(
            ScriptedBrowser::new(site),
            StaticChecker::new().failing(SITE),
        );
        let project = project(&h, None).await;

        let ticket = h.orchestrator.start_audit(project.id).await.unwrap();
        ticket.task.await.unwrap();

        let audit = h.orchestrator.get_audit(ticket.audit_id).await.unwrap();
        assert_eq!(audit.status, AuditStatus::Completed);
        assert_eq!(audit.pages_audited[0].status, PageStatus::Error);
        assert_eq!(audit.summary.unwrap().untested, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn start_navigation_failure_still_closes_the_browser() {
        let site = ScriptedSite::new().failing(SITE);
        let h = harness(ScriptedBrowser::new(site), StaticChecker::new());
        let project = project(&h, None).await;

        let ticket = h.orchestrator.start_audit(project.id).await.unwrap();
        ticket.task.await.unwrap();

        let audit = h.orchestrator.get_audit(ticket.audit_id).await.unwrap();
        assert_eq!(audit.status, AuditStatus::Error);
        assert!(
            audit
                .error_message
                .as_deref()
                .unwrap()
                .starts_with("navigation failed")
        );
        assert_eq!(h.log.closes(), 1);
    }

    #[tokio::test]
    async fn launch_failure_marks_the_audit_failed() {
        let browser = ScriptedBrowser::new(ScriptedSite::new()).failing_launch();
        let h = harness(browser, StaticChecker::new());
        let project = project(&h, None).await;

        let ticket = h.orchestrator.start_audit(project.id).await.unwrap();
        ticket.task.await.unwrap();

        let status = h.orchestrator.audit_status(ticket.audit_id).await.unwrap();
        assert_eq!(status.status, AuditStatus::Error);
        assert!(status.error_message.unwrap().contains("launch"));
        assert_eq!(h.log.closes(), 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_reported() {
        let h = harness(ScriptedBrowser::new(ScriptedSite::new()), StaticChecker::new());

        assert!(matches!(
            h.orchestrator.start_audit(ProjectId::new()).await,
            Err(AuditError::ProjectNotFound)
        ));
        assert!(matches!(
            h.orchestrator.confirm_auth(AuditId::new()).await,
            Err(AuditError::AuditNotFound)
        ));
        assert!(matches!(
            h.orchestrator.list_audits(ProjectId::new()).await,
            Err(AuditError::ProjectNotFound)
        ));
    }

    #[tokio::test]
    async fn running_audits_cannot_be_deleted() {
        let h = harness(ScriptedBrowser::new(ScriptedSite::new()), StaticChecker::new());
        let project = project(&h, None).await;

        let mut audit = Audit::pending(project.id, SITE, vec![]);
        h.audits.create(&audit).await.unwrap();
        assert!(matches!(
            h.orchestrator.delete_audit(audit.id).await,
            Err(AuditError::AuditInProgress)
        ));

        audit.fail("stopped", Utc::now()).unwrap();
        h.audits.save(&audit).await.unwrap();
        h.orchestrator.delete_audit(audit.id).await.unwrap();
        assert!(matches!(
            h.orchestrator.get_audit(audit.id).await,
            Err(AuditError::AuditNotFound)
        ));
    }

    /// Rejects the save that would mark an audit completed.
    struct RejectCompleted(InMemoryAuditStore);

    #[async_trait::async_trait]
    impl AuditStore for RejectCompleted {
        async fn create(&self, audit: &Audit) -> StoreResult<AuditId> {
            self.0.create(audit).await
        }

        async fn load(&self, id: AuditId) -> StoreResult<Option<Audit>> {
            self.0.load(id).await
        }

        async fn save(&self, audit: &Audit) -> StoreResult<()> {
            if audit.status == AuditStatus::Completed {
                return Err(StoreError::Conflict("disk full".into()));
            }
            self.0.save(audit).await
        }

        async fn list_for_project(&self, project_id: ProjectId) -> StoreResult<Vec<Audit>> {
            self.0.list_for_project(project_id).await
        }

        async fn delete(&self, id: AuditId) -> StoreResult<bool> {
            self.0.delete(id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_completion_save_is_persisted_as_error() {
        let projects = Arc::new(InMemoryProjectStore::new());
        let audits = Arc::new(RejectCompleted(InMemoryAuditStore::new()));
        let site = ScriptedSite::new().page(SITE, PageScript::titled("Home"));
        let orchestrator = AuditOrchestrator::builder(AuditConfig::default())
            .with_projects(projects.clone())
            .with_audits(audits.clone())
            .with_launcher(Arc::new(ScriptedBrowser::new(site)))
            .with_checker(Arc::new(StaticChecker::new()))
            .with_catalog(Catalog::new(vec![criterion("C1", &["image-alt"])]))
            .build()
            .unwrap();

        let now = Utc::now();
        let project = Project {
            id: ProjectId::new(),
            name: "Site".into(),
            description: String::new(),
            url: SITE.into(),
            auth: None,
            pages: vec![],
            created_at: now,
            updated_at: now,
        };
        projects.create(&project).await.unwrap();

        let ticket = orchestrator.start_audit(project.id).await.unwrap();
        ticket.task.await.unwrap();

        let audit = orchestrator.get_audit(ticket.audit_id).await.unwrap();
        assert_eq!(audit.status, AuditStatus::Error);
        assert!(audit.error_message.is_some_and(|msg| msg.contains("disk full")));
    }

    #[tokio::test]
    async fn builder_requires_stores_and_collaborators() {
        let err = AuditOrchestrator::builder(AuditConfig::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, AuditError::Internal(_)));
    }
}
