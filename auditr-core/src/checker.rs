//! External accessibility rule engine capability.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::browser::{BrowserError, BrowserPage};

/// Errors raised while running the rule engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckerError {
    /// The engine script could not be read.
    #[error("checker script unavailable: {0}")]
    ScriptUnavailable(String),

    /// The engine could not be injected into the page.
    #[error("checker injection failed: {0}")]
    Injection(String),

    /// The engine threw while running.
    #[error("checker run failed: {0}")]
    Run(String),

    /// The engine answered with a payload that could not be decoded.
    #[error("malformed checker output: {0}")]
    Malformed(String),

    /// A browser call failed underneath.
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// One affected DOM node as reported by the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExcerpt {
    /// Outer HTML excerpt.
    #[serde(default)]
    pub html: String,
    /// Selector path; nested frame/shadow selectors are flattened.
    #[serde(default, deserialize_with = "selector_path")]
    pub target: Vec<String>,
    /// Engine explanation of the failure.
    #[serde(default)]
    pub failure_summary: Option<String>,
}

/// A rule outcome: a violation, a pass or an inapplicable rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFinding {
    /// Rule id, e.g. `image-alt`.
    pub id: String,
    /// `minor` through `critical`; absent on passes.
    #[serde(default)]
    pub impact: Option<String>,
    /// What the rule checks.
    #[serde(default)]
    pub description: String,
    /// Short fix hint.
    #[serde(default)]
    pub help: String,
    /// Link to the rule documentation.
    #[serde(default)]
    pub help_url: String,
    /// Standards the rule belongs to.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Offending or passing nodes.
    #[serde(default)]
    pub nodes: Vec<NodeExcerpt>,
}

/// Everything the rule engine reported for one page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckerReport {
    /// Rules that failed.
    #[serde(default)]
    pub violations: Vec<RuleFinding>,
    /// Rules that passed.
    #[serde(default)]
    pub passes: Vec<RuleFinding>,
    /// Rules with nothing to check.
    #[serde(default)]
    pub inapplicable: Vec<RuleFinding>,
}

/// Runs accessibility rules against a loaded page.
#[async_trait]
pub trait AccessibilityChecker: Send + Sync {
    /// Run the rules selected by `tags` against the currently loaded page.
    async fn analyze(
        &self,
        page: &dyn BrowserPage,
        tags: &[String],
    ) -> Result<CheckerReport, CheckerError>;
}

fn selector_path<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn flatten(value: Value, out: &mut Vec<String>) {
        match value {
            Value::String(selector) => out.push(selector),
            Value::Array(items) => {
                for item in items {
                    flatten(item, out);
                }
            }
            _ => {}
        }
    }

    let raw = Option::<Value>::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(value) = raw {
        flatten(value, &mut out);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_targets_are_flattened() {
        let finding: RuleFinding = serde_json::from_value(serde_json::json!({
            "id": "image-alt",
            "impact": "critical",
            "help": "Images must have alternate text",
            "helpUrl": "https://dequeuniversity.com/rules/axe/4.10/image-alt",
            "nodes": [{
                "html": "<img src=\"a.png\">",
                "target": [["#frame", "img"]],
                "failureSummary": "Fix any of the following"
            }]
        }))
        .unwrap();

        assert_eq!(finding.nodes[0].target, vec!["#frame", "img"]);
        assert_eq!(finding.description, "");
    }
}
