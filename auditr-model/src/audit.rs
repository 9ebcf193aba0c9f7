use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::{AuditId, ProjectId};

/// Lifecycle of one audit run.
///
/// `pending → running → (waiting-auth ⇄ running)* → completed | error`.
/// `completed` and `error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditStatus {
    Pending,
    Running,
    WaitingAuth,
    Completed,
    Error,
}

impl AuditStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn can_transition_to(self, next: AuditStatus) -> bool {
        if self == next || self.is_terminal() {
            return false;
        }

        match next {
            AuditStatus::Pending => false,
            AuditStatus::Running => {
                matches!(self, AuditStatus::Pending | AuditStatus::WaitingAuth)
            }
            AuditStatus::WaitingAuth => matches!(self, AuditStatus::Running),
            AuditStatus::Completed => matches!(self, AuditStatus::Running),
            AuditStatus::Error => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Pending => "pending",
            AuditStatus::Running => "running",
            AuditStatus::WaitingAuth => "waiting-auth",
            AuditStatus::Completed => "completed",
            AuditStatus::Error => "error",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConformanceLevel {
    A,
    AA,
    AAA,
}

/// Outcome of one catalog criterion for an audit run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CriterionOutcome {
    Compliant,
    NonCompliant,
    NotApplicable,
    #[default]
    Untested,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionResult {
    pub id: String,
    pub theme: String,
    pub title: String,
    pub level: ConformanceLevel,
    pub result: CriterionOutcome,
    #[serde(default)]
    pub details: Vec<String>,
    /// External rule identifiers this criterion subsumes.
    #[serde(default)]
    pub rule_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Success,
    Error,
}

/// Outcome of scanning one discovered URL. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub url: String,
    pub title: String,
    pub status: PageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub violations_count: usize,
    pub passes_count: usize,
}

impl PageResult {
    pub fn success(
        url: impl Into<String>,
        title: impl Into<String>,
        violations_count: usize,
        passes_count: usize,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            status: PageStatus::Success,
            error_message: None,
            violations_count,
            passes_count,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: url.clone(),
            url,
            status: PageStatus::Error,
            error_message: Some(error.into()),
            violations_count: 0,
            passes_count: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PageStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedNode {
    pub html: String,
    #[serde(default)]
    pub target: Vec<String>,
    #[serde(default)]
    pub failure_summary: String,
}

/// A persisted violation, unique per `(rule_id, page_url)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFinding {
    pub rule_id: String,
    pub impact: String,
    pub description: String,
    pub help: String,
    pub help_url: String,
    pub page_url: String,
    #[serde(default)]
    pub nodes: Vec<AffectedNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub compliant: usize,
    pub non_compliant: usize,
    pub not_applicable: usize,
    pub untested: usize,
    /// Rounded percentage in `0..=100`.
    pub compliance_rate: u8,
    pub pages_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub id: AuditId,
    pub project_id: ProjectId,
    pub url: String,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pages_audited: Vec<PageResult>,
    #[serde(default)]
    pub criteria: Vec<CriterionResult>,
    #[serde(default)]
    pub summary: Option<Summary>,
    #[serde(default)]
    pub raw_findings: Vec<RawFinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Audit {
    /// A fresh `pending` audit with every criterion `untested`.
    pub fn pending(
        project_id: ProjectId,
        url: impl Into<String>,
        criteria: Vec<CriterionResult>,
    ) -> Self {
        Self {
            id: AuditId::new(),
            project_id,
            url: url.into(),
            status: AuditStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            pages_audited: Vec::new(),
            criteria,
            summary: None,
            raw_findings: Vec::new(),
            error_message: None,
        }
    }

    /// Apply a lifecycle transition, rejecting moves the table forbids.
    ///
    /// Entering `running` for the first time stamps `started_at`; entering a
    /// terminal state stamps `completed_at`.
    pub fn transition(
        &mut self,
        next: AuditStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ModelError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        match next {
            AuditStatus::Running if self.started_at.is_none() => {
                self.started_at = Some(now);
            }
            AuditStatus::Completed | AuditStatus::Error => {
                self.completed_at = Some(now);
            }
            _ => {}
        }
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(AuditStatus::Error, now)?;
        self.error_message = Some(message.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AuditStatus; 5] = [
        AuditStatus::Pending,
        AuditStatus::Running,
        AuditStatus::WaitingAuth,
        AuditStatus::Completed,
        AuditStatus::Error,
    ];

    #[test]
    fn terminal_states_never_move() {
        for from in [AuditStatus::Completed, AuditStatus::Error] {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn auth_pause_round_trips() {
        assert!(AuditStatus::Running.can_transition_to(AuditStatus::WaitingAuth));
        assert!(AuditStatus::WaitingAuth.can_transition_to(AuditStatus::Running));
        assert!(!AuditStatus::Pending.can_transition_to(AuditStatus::WaitingAuth));
        assert!(!AuditStatus::WaitingAuth.can_transition_to(AuditStatus::Completed));
    }

    #[test]
    fn transition_stamps_timestamps_once() {
        let mut audit = Audit::pending(ProjectId::new(), "https://a.test", vec![]);
        let t0 = Utc::now();
        audit.transition(AuditStatus::Running, t0).unwrap();
        audit.transition(AuditStatus::WaitingAuth, t0).unwrap();
        let t1 = t0 + chrono::Duration::seconds(30);
        audit.transition(AuditStatus::Running, t1).unwrap();
        assert_eq!(audit.started_at, Some(t0));

        audit.transition(AuditStatus::Completed, t1).unwrap();
        assert_eq!(audit.completed_at, Some(t1));

        let err = audit.transition(AuditStatus::Running, t1).unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidTransition {
                from: AuditStatus::Completed,
                to: AuditStatus::Running
            }
        );
    }

    #[test]
    fn status_serializes_kebab_case() {
        let raw = serde_json::to_string(&AuditStatus::WaitingAuth).unwrap();
        assert_eq!(raw, "\"waiting-auth\"");
        let raw = serde_json::to_string(&CriterionOutcome::NotApplicable).unwrap();
        assert_eq!(raw, "\"not-applicable\"");
    }
}
