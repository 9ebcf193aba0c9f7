use std::{fmt, sync::Arc};

use auditr_core::{AuditOrchestrator, ProjectStore};

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub projects: Arc<dyn ProjectStore>,
    pub orchestrator: AuditOrchestrator,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(projects: Arc<dyn ProjectStore>, orchestrator: AuditOrchestrator) -> Self {
        Self {
            projects,
            orchestrator,
        }
    }
}
