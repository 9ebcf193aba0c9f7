//! PostgreSQL stores backed by `sqlx`.

use async_trait::async_trait;
use auditr_model::{Audit, AuditId, Project, ProjectAuthConfig, ProjectId};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use uuid::Uuid;

use super::{AuditStore, ProjectStore, StoreError, StoreResult};

/// Projects stored in the `projects` table.
#[derive(Clone, Debug)]
pub struct PostgresProjectStore {
    pool: PgPool,
}

impl PostgresProjectStore {
    /// Create an empty instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_project(row: PgRow) -> StoreResult<Project> {
        let id: Uuid = row.try_get("id")?;
        let auth: Option<Json<ProjectAuthConfig>> = row.try_get("auth")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
        Ok(Project {
            id: ProjectId(id),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            url: row.try_get("url")?,
            auth: auth.map(|Json(auth)| auth),
            pages: row.try_get("pages")?,
            created_at,
            updated_at,
        })
    }
}

const PROJECT_COLUMNS: &str =
    "id, name, description, url, auth, pages, created_at, updated_at";

#[async_trait]
impl ProjectStore for PostgresProjectStore {
    async fn find_by_id(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        let row = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_project).transpose()
    }

    async fn list(&self) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_project).collect()
    }

    async fn create(&self, project: &Project) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, url, auth, pages, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id.to_uuid())
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.url)
        .bind(project.auth.as_ref().map(Json))
        .bind(&project.pages)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, project: &Project) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET name = $2, description = $3, url = $4, auth = $5, pages = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(project.id.to_uuid())
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.url)
        .bind(project.auth.as_ref().map(Json))
        .bind(&project.pages)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(project.id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: ProjectId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id.to_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Audits are stored whole as JSONB; `status` and `project_id` are lifted
/// into columns for filtering.
#[derive(Clone, Debug)]
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    /// Create an empty instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn create(&self, audit: &Audit) -> StoreResult<AuditId> {
        sqlx::query(
            r#"
            INSERT INTO audits (id, project_id, status, created_at, updated_at, body)
            VALUES ($1, $2, $3, $4, now(), $5)
            "#,
        )
        .bind(audit.id.to_uuid())
        .bind(audit.project_id.to_uuid())
        .bind(audit.status.as_str())
        .bind(audit.created_at)
        .bind(Json(audit))
        .execute(&self.pool)
        .await?;
        Ok(audit.id)
    }

    async fn load(&self, id: AuditId) -> StoreResult<Option<Audit>> {
        let body: Option<Json<Audit>> =
            sqlx::query_scalar("SELECT body FROM audits WHERE id = $1")
                .bind(id.to_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(body.map(|Json(audit)| audit))
    }

    async fn save(&self, audit: &Audit) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE audits SET status = $2, body = $3, updated_at = now() WHERE id = $1",
        )
        .bind(audit.id.to_uuid())
        .bind(audit.status.as_str())
        .bind(Json(audit))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(audit.id.to_string()));
        }
        Ok(())
    }

    async fn list_for_project(&self, project_id: ProjectId) -> StoreResult<Vec<Audit>> {
        let bodies: Vec<Json<Audit>> = sqlx::query_scalar(
            "SELECT body FROM audits WHERE project_id = $1 ORDER BY created_at DESC",
        )
        .bind(project_id.to_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(bodies.into_iter().map(|Json(audit)| audit).collect())
    }

    async fn delete(&self, id: AuditId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM audits WHERE id = $1")
            .bind(id.to_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
