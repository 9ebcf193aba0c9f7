use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{Audit, AuditStatus, PageResult, Summary};
use crate::ids::{AuditId, ProjectId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAuditResponse {
    pub audit_id: AuditId,
    pub status: AuditStatus,
}

/// Polling view of an audit: everything but the bulky result lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStatusView {
    pub status: AuditStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Audit> for AuditStatusView {
    fn from(audit: &Audit) -> Self {
        Self {
            status: audit.status,
            summary: audit.summary,
            error_message: audit.error_message.clone(),
            started_at: audit.started_at,
            completed_at: audit.completed_at,
        }
    }
}

/// Audit listing entry; omits criteria and raw findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListItem {
    pub id: AuditId,
    pub project_id: ProjectId,
    pub url: String,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub pages_audited: Vec<PageResult>,
    pub summary: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&Audit> for AuditListItem {
    fn from(audit: &Audit) -> Self {
        Self {
            id: audit.id,
            project_id: audit.project_id,
            url: audit.url.clone(),
            status: audit.status,
            created_at: audit.created_at,
            started_at: audit.started_at,
            completed_at: audit.completed_at,
            pages_audited: audit.pages_audited.clone(),
            summary: audit.summary,
            error_message: audit.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
