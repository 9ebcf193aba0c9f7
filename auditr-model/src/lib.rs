//! Core data model definitions shared across auditr crates.
#![allow(missing_docs)]

pub mod api;
pub mod audit;
pub mod error;
pub mod ids;
pub mod project;
pub mod routes;

// Intentionally curated re-exports for downstream consumers.
pub use api::{
    AuditListItem, AuditStatusView, HealthResponse, MessageResponse,
    StartAuditResponse,
};
pub use audit::{
    AffectedNode, Audit, AuditStatus, ConformanceLevel, CriterionOutcome,
    CriterionResult, PageResult, PageStatus, RawFinding, Summary,
};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{AuditId, ProjectId};
pub use project::{
    CreateProjectRequest, Project, ProjectAuthConfig, UpdateProjectRequest,
};
