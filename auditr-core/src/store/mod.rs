//! Persistence ports for projects and audits.

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

use async_trait::async_trait;
use auditr_model::{Audit, AuditId, Project, ProjectId};
use thiserror::Error;

pub use memory::{InMemoryAuditStore, InMemoryProjectStore};
#[cfg(feature = "database")]
pub use postgres::{PostgresAuditStore, PostgresProjectStore};

/// Storage failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record with that id.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A record with that id exists.
    #[error("record already exists: {0}")]
    Conflict(String),

    /// A JSON column could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Query or connection failure.
    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[cfg(feature = "database")]
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Storage result alias.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Project persistence.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Look up one project.
    async fn find_by_id(&self, id: ProjectId) -> StoreResult<Option<Project>>;

    /// Newest first.
    async fn list(&self) -> StoreResult<Vec<Project>>;

    /// Fails with `Conflict` when the id exists.
    async fn create(&self, project: &Project) -> StoreResult<()>;

    /// Fails with `NotFound` when the id is unknown.
    async fn update(&self, project: &Project) -> StoreResult<()>;

    /// Returns false when no such project existed.
    async fn delete(&self, id: ProjectId) -> StoreResult<bool>;
}

/// Audit persistence. Audits are stored whole and rewritten on every status change.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Store a new audit and return its id.
    async fn create(&self, audit: &Audit) -> StoreResult<AuditId>;

    /// Look up one audit.
    async fn load(&self, id: AuditId) -> StoreResult<Option<Audit>>;

    /// Overwrite an existing audit record.
    async fn save(&self, audit: &Audit) -> StoreResult<()>;

    /// Newest first.
    async fn list_for_project(&self, project_id: ProjectId) -> StoreResult<Vec<Audit>>;

    /// Returns false when no such audit existed.
    async fn delete(&self, id: AuditId) -> StoreResult<bool>;
}
