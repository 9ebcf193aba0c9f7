//! HTTP request handlers organized by resource

pub mod audits;
pub mod health;
pub mod projects;

use auditr_model::{AuditId, ProjectId};

use crate::infra::errors::AppError;

pub(crate) fn parse_project_id(raw: &str) -> Result<ProjectId, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("invalid project id: {raw}")))
}

pub(crate) fn parse_audit_id(raw: &str) -> Result<AuditId, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("invalid audit id: {raw}")))
}
