//! Reduction of per-page rule outcomes into criterion results.
//!
//! Violations are applied before passes, passes before inapplicable rules.
//! A criterion hit by any violation stays `non-compliant` no matter how many
//! other pages pass the same rule.

use std::collections::{HashMap, HashSet};

use auditr_model::{
    AffectedNode, CriterionOutcome, CriterionResult, RawFinding, Summary,
};
use url::Url;

use crate::checker::RuleFinding;
use crate::scanner::PageFindings;

const DETAIL_NODES_PER_VIOLATION: usize = 5;
const DETAIL_HTML_CHARS: usize = 150;
const RAW_FINDING_NODES: usize = 10;
const RAW_FINDING_HTML_CHARS: usize = 300;

/// Criterion outcomes, summary and raw findings of a finished audit.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Every catalog criterion with its outcome.
    pub criteria: Vec<CriterionResult>,
    /// Totals and compliance rate.
    pub summary: Summary,
    /// Capped per-rule excerpts kept for the report.
    pub raw_findings: Vec<RawFinding>,
}

/// Fold every page's findings into `criteria`.
///
/// `pages_count` is the number of successfully scanned pages.
pub fn aggregate(
    mut criteria: Vec<CriterionResult>,
    pages: &[PageFindings],
    pages_count: usize,
) -> Aggregation {
    let index = rule_index(&criteria);
    let mapped = |rule_id: &str| -> Vec<usize> {
        index.get(rule_id).cloned().unwrap_or_default()
    };

    for page in pages {
        let label = page_label(&page.page_url);
        for violation in &page.violations {
            let impact = violation
                .impact
                .as_deref()
                .unwrap_or("unknown")
                .to_uppercase();
            for idx in mapped(&violation.id) {
                let criterion = &mut criteria[idx];
                criterion.result = CriterionOutcome::NonCompliant;
                criterion.details.extend(
                    violation.nodes.iter().take(DETAIL_NODES_PER_VIOLATION).map(
                        |node| {
                            format!(
                                "{label} [{impact}] {} - {}",
                                violation.help,
                                truncate_chars(&node.html, DETAIL_HTML_CHARS)
                            )
                        },
                    ),
                );
            }
        }
    }

    for pass in pages.iter().flat_map(|page| &page.passes) {
        for idx in mapped(&pass.id) {
            let criterion = &mut criteria[idx];
            if criterion.result == CriterionOutcome::Untested {
                criterion.result = CriterionOutcome::Compliant;
                criterion.details.push(format!("✓ {}", pass.help));
            }
        }
    }

    for rule in pages.iter().flat_map(|page| &page.inapplicable) {
        for idx in mapped(&rule.id) {
            let criterion = &mut criteria[idx];
            if criterion.result == CriterionOutcome::Untested {
                criterion.result = CriterionOutcome::NotApplicable;
            }
        }
    }

    let summary = summarize(&criteria, pages_count);
    let raw_findings = dedupe_violations(pages);

    Aggregation {
        criteria,
        summary,
        raw_findings,
    }
}

/// Count outcomes and derive the compliance rate over tested criteria.
pub fn summarize(criteria: &[CriterionResult], pages_count: usize) -> Summary {
    let count = |outcome: CriterionOutcome| {
        criteria.iter().filter(|c| c.result == outcome).count()
    };
    let total = criteria.len();
    let compliant = count(CriterionOutcome::Compliant);
    let not_applicable = count(CriterionOutcome::NotApplicable);

    Summary {
        total,
        compliant,
        non_compliant: count(CriterionOutcome::NonCompliant),
        not_applicable,
        untested: count(CriterionOutcome::Untested),
        compliance_rate: compliance_rate(compliant, total - not_applicable),
        pages_count,
    }
}

/// `round(compliant / applicable * 100)`, 0 when nothing is applicable.
pub fn compliance_rate(compliant: usize, applicable: usize) -> u8 {
    if applicable == 0 {
        return 0;
    }
    let rate = (compliant as f64 / applicable as f64 * 100.0).round();
    rate.clamp(0.0, 100.0) as u8
}

/// One raw finding per `(rule id, page url)`; the first occurrence wins.
pub fn dedupe_violations(pages: &[PageFindings]) -> Vec<RawFinding> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut out = Vec::new();
    for page in pages {
        for violation in &page.violations {
            if seen.insert((violation.id.as_str(), page.page_url.as_str())) {
                out.push(raw_finding(violation, &page.page_url));
            }
        }
    }
    out
}

fn raw_finding(violation: &RuleFinding, page_url: &str) -> RawFinding {
    RawFinding {
        rule_id: violation.id.clone(),
        impact: violation
            .impact
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        description: violation.description.clone(),
        help: violation.help.clone(),
        help_url: violation.help_url.clone(),
        page_url: page_url.to_string(),
        nodes: violation
            .nodes
            .iter()
            .take(RAW_FINDING_NODES)
            .map(|node| AffectedNode {
                html: truncate_chars(&node.html, RAW_FINDING_HTML_CHARS).to_string(),
                target: node.target.clone(),
                failure_summary: node.failure_summary.clone().unwrap_or_default(),
            })
            .collect(),
    }
}

fn rule_index(criteria: &[CriterionResult]) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, criterion) in criteria.iter().enumerate() {
        for rule in &criterion.rule_ids {
            let slots = index.entry(rule.clone()).or_default();
            if !slots.contains(&idx) {
                slots.push(idx);
            }
        }
    }
    index
}

fn page_label(page_url: &str) -> String {
    match Url::parse(page_url) {
        Ok(url) => format!("[{}]", url.path()),
        Err(_) => format!("[{page_url}]"),
    }
}

fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((byte_idx, _)) => &value[..byte_idx],
        None => value,
    }
}
