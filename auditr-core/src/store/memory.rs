//! `DashMap` stores for tests and database-less runs.

use async_trait::async_trait;
use auditr_model::{Audit, AuditId, Project, ProjectId};
use dashmap::DashMap;

use super::{AuditStore, ProjectStore, StoreError, StoreResult};

/// Process-local project store.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    projects: DashMap<ProjectId, Project>,
}

impl InMemoryProjectStore {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn find_by_id(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.projects.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> =
            self.projects.iter().map(|entry| entry.value().clone()).collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn create(&self, project: &Project) -> StoreResult<()> {
        if self.projects.contains_key(&project.id) {
            return Err(StoreError::Conflict(project.id.to_string()));
        }
        self.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn update(&self, project: &Project) -> StoreResult<()> {
        match self.projects.get_mut(&project.id) {
            Some(mut entry) => {
                *entry = project.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(project.id.to_string())),
        }
    }

    async fn delete(&self, id: ProjectId) -> StoreResult<bool> {
        Ok(self.projects.remove(&id).is_some())
    }
}

/// Process-local audit store.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    audits: DashMap<AuditId, Audit>,
}

impl InMemoryAuditStore {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn create(&self, audit: &Audit) -> StoreResult<AuditId> {
        if self.audits.contains_key(&audit.id) {
            return Err(StoreError::Conflict(audit.id.to_string()));
        }
        self.audits.insert(audit.id, audit.clone());
        Ok(audit.id)
    }

    async fn load(&self, id: AuditId) -> StoreResult<Option<Audit>> {
        Ok(self.audits.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, audit: &Audit) -> StoreResult<()> {
        match self.audits.get_mut(&audit.id) {
            Some(mut entry) => {
                *entry = audit.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(audit.id.to_string())),
        }
    }

    async fn list_for_project(&self, project_id: ProjectId) -> StoreResult<Vec<Audit>> {
        let mut audits: Vec<Audit> = self
            .audits
            .iter()
            .filter(|entry| entry.value().project_id == project_id)
            .map(|entry| entry.value().clone())
            .collect();
        audits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(audits)
    }

    async fn delete(&self, id: AuditId) -> StoreResult<bool> {
        Ok(self.audits.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditr_model::CreateProjectRequest;

    #[tokio::test]
    async fn audit_save_requires_existing_record() {
        let store = InMemoryAuditStore::new();
        let audit = Audit::pending(ProjectId::new(), "https://a.test", vec![]);
        assert!(matches!(store.save(&audit).await, Err(StoreError::NotFound(_))));

        store.create(&audit).await.unwrap();
        let mut updated = audit.clone();
        updated.error_message = Some("boom".into());
        store.save(&updated).await.unwrap();
        let loaded = store.load(audit.id).await.unwrap().unwrap();
        assert_eq!(loaded.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn audits_listed_per_project() {
        let store = InMemoryAuditStore::new();
        let project = ProjectId::new();
        for _ in 0..3 {
            store
                .create(&Audit::pending(project, "https://a.test", vec![]))
                .await
                .unwrap();
        }
        store
            .create(&Audit::pending(ProjectId::new(), "https://b.test", vec![]))
            .await
            .unwrap();

        let listed = store.list_for_project(project).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn project_crud() {
        let store = InMemoryProjectStore::new();
        let project = CreateProjectRequest {
            name: "Site".into(),
            url: "https://a.test".into(),
            ..Default::default()
        }
        .into_project()
        .unwrap();

        store.create(&project).await.unwrap();
        assert!(matches!(store.create(&project).await, Err(StoreError::Conflict(_))));
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert!(store.delete(project.id).await.unwrap());
        assert!(!store.delete(project.id).await.unwrap());
        assert!(store.find_by_id(project.id).await.unwrap().is_none());
    }
}
