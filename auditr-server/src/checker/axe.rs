//! axe-core driven through page script evaluation.

use async_trait::async_trait;
use auditr_config::CheckerConfig;
use auditr_core::{AccessibilityChecker, BrowserPage, CheckerError, CheckerReport};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const AXE_LOADED_EXPRESSION: &str = "typeof window.axe !== 'undefined'";

/// Runs axe-core inside the audited page.
///
/// The bundle is loaded once per process, from `axe_script_path` when set
/// and from `axe_script_url` otherwise, then injected into every page that
/// does not already carry it.
pub struct AxeChecker {
    config: CheckerConfig,
    http: reqwest::Client,
    script: OnceCell<String>,
}

impl std::fmt::Debug for AxeChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxeChecker")
            .field("script_path", &self.config.axe_script_path)
            .field("script_url", &self.config.axe_script_url)
            .field("script_loaded", &self.script.initialized())
            .finish_non_exhaustive()
    }
}

impl AxeChecker {
    pub fn new(config: CheckerConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            script: OnceCell::new(),
        }
    }

    /// Use an already loaded bundle instead of reading or fetching one.
    pub fn with_script(config: CheckerConfig, script: impl Into<String>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            script: OnceCell::new_with(Some(script.into())),
        }
    }

    async fn script(&self) -> Result<&str, CheckerError> {
        self.script
            .get_or_try_init(|| self.load_script())
            .await
            .map(String::as_str)
    }

    async fn load_script(&self) -> Result<String, CheckerError> {
        if let Some(path) = &self.config.axe_script_path {
            let script = tokio::fs::read_to_string(path).await.map_err(|err| {
                CheckerError::ScriptUnavailable(format!("{}: {err}", path.display()))
            })?;
            info!(path = %path.display(), "loaded axe-core bundle");
            return Ok(script);
        }

        let url = &self.config.axe_script_url;
        let script = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CheckerError::ScriptUnavailable(format!("{url}: {err}")))?
            .text()
            .await
            .map_err(|err| CheckerError::ScriptUnavailable(format!("{url}: {err}")))?;
        info!(url = %url, bytes = script.len(), "fetched axe-core bundle");
        Ok(script)
    }

    async fn ensure_injected(&self, page: &dyn BrowserPage) -> Result<(), CheckerError> {
        if page.evaluate(AXE_LOADED_EXPRESSION).await? == Value::Bool(true) {
            return Ok(());
        }

        let script = self.script().await?;
        page.evaluate(script)
            .await
            .map_err(|err| CheckerError::Injection(err.to_string()))?;

        match page.evaluate(AXE_LOADED_EXPRESSION).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(CheckerError::Injection(
                "axe is still undefined after injection".to_string(),
            )),
        }
    }
}

fn run_expression(tags: &[String]) -> Result<String, CheckerError> {
    let tags = serde_json::to_string(tags)
        .map_err(|err| CheckerError::Run(err.to_string()))?;
    Ok(format!(
        "axe.run(document, {{ runOnly: {{ type: 'tag', values: {tags} }} }})\
         .then(r => ({{ violations: r.violations, passes: r.passes, inapplicable: r.inapplicable }}))"
    ))
}

#[async_trait]
impl AccessibilityChecker for AxeChecker {
    async fn analyze(
        &self,
        page: &dyn BrowserPage,
        tags: &[String],
    ) -> Result<CheckerReport, CheckerError> {
        self.ensure_injected(page).await?;

        let expression = run_expression(tags)?;
        let raw = page
            .evaluate(&expression)
            .await
            .map_err(|err| CheckerError::Run(err.to_string()))?;
        if raw.is_null() {
            return Err(CheckerError::Malformed("axe.run returned nothing".to_string()));
        }

        let report: CheckerReport = serde_json::from_value(raw)
            .map_err(|err| CheckerError::Malformed(err.to_string()))?;
        debug!(
            violations = report.violations.len(),
            passes = report.passes.len(),
            inapplicable = report.inapplicable.len(),
            "axe run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use auditr_core::BrowserError;
    use serde_json::json;

    use super::*;

    /// Answers the loaded check from `loaded` and records every other expression.
    struct InjectionPage {
        loaded: Mutex<bool>,
        injectable: bool,
        report: Value,
        evaluated: Mutex<Vec<String>>,
    }

    impl InjectionPage {
        fn new(loaded: bool, report: Value) -> Self {
            Self {
                loaded: Mutex::new(loaded),
                injectable: true,
                report,
                evaluated: Mutex::new(Vec::new()),
            }
        }

        fn evaluated(&self) -> Vec<String> {
            self.evaluated.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BrowserPage for InjectionPage {
        async fn goto(&self, _url: &str, _timeout: Duration) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
            if expression == AXE_LOADED_EXPRESSION {
                return Ok(Value::Bool(*self.loaded.lock().unwrap()));
            }
            self.evaluated.lock().unwrap().push(expression.to_string());
            if expression.starts_with("axe.run") {
                return Ok(self.report.clone());
            }
            if self.injectable {
                *self.loaded.lock().unwrap() = true;
            }
            Ok(Value::Null)
        }

        async fn click_at(&self, _x: f64, _y: f64) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn title(&self) -> Result<String, BrowserError> {
            Ok(String::new())
        }

        async fn url(&self) -> Result<String, BrowserError> {
            Ok("https://site.test/".to_string())
        }

        async fn go_back(&self, _timeout: Duration) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    fn tags() -> Vec<String> {
        vec!["wcag2a".to_string(), "wcag2aa".to_string()]
    }

    fn report() -> Value {
        json!({
            "violations": [{
                "id": "image-alt",
                "impact": "critical",
                "help": "Images must have alternate text",
                "nodes": [{ "html": "<img>", "target": ["img"] }]
            }],
            "passes": [{ "id": "document-title" }],
            "inapplicable": []
        })
    }

    #[test]
    fn run_expression_embeds_tags_as_json() {
        let expression = run_expression(&tags()).unwrap();
        assert!(expression.contains(r#"values: ["wcag2a","wcag2aa"]"#));
        assert!(expression.starts_with("axe.run(document"));
    }

    #[tokio::test]
    async fn injects_once_then_parses_the_report() {
        let checker = AxeChecker::with_script(CheckerConfig::default(), "window.axe = {};");
        let page = InjectionPage::new(false, report());

        let parsed = checker.analyze(&page, &tags()).await.unwrap();
        assert_eq!(parsed.violations[0].id, "image-alt");
        assert_eq!(parsed.passes.len(), 1);

        checker.analyze(&page, &tags()).await.unwrap();
        let injected = page
            .evaluated()
            .iter()
            .filter(|expr| expr.as_str() == "window.axe = {};")
            .count();
        assert_eq!(injected, 1);
    }

    #[tokio::test]
    async fn failed_injection_is_reported() {
        let checker = AxeChecker::with_script(CheckerConfig::default(), "void 0;");
        let mut page = InjectionPage::new(false, report());
        page.injectable = false;

        let err = checker.analyze(&page, &tags()).await.unwrap_err();
        assert!(matches!(err, CheckerError::Injection(_)));
    }

    #[tokio::test]
    async fn malformed_output_is_rejected() {
        let checker = AxeChecker::with_script(CheckerConfig::default(), "");
        let page = InjectionPage::new(true, json!({ "violations": "nope" }));

        let err = checker.analyze(&page, &tags()).await.unwrap_err();
        assert!(matches!(err, CheckerError::Malformed(_)));
    }

    #[tokio::test]
    async fn missing_script_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let checker = AxeChecker::new(CheckerConfig {
            axe_script_path: Some(dir.path().join("axe.min.js")),
            ..CheckerConfig::default()
        });
        let page = InjectionPage::new(false, report());

        let err = checker.analyze(&page, &tags()).await.unwrap_err();
        assert!(matches!(err, CheckerError::ScriptUnavailable(_)));
    }
}
