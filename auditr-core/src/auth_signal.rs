//! Hand-off between a paused audit and the human confirming their login.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use auditr_model::AuditId;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

/// Why an authentication wait ended without a confirmation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSignalError {
    /// The deadline passed.
    #[error("authentication confirmation deadline passed")]
    Timeout,

    /// Another waiter was registered for the same audit.
    #[error("authentication wait was replaced by a newer waiter")]
    Superseded,
}

struct PendingAuth {
    token: u64,
    confirm: oneshot::Sender<()>,
}

/// Audit id → pending confirmation handle.
///
/// Cloning shares the same map. The orchestrator and the HTTP confirmation
/// handler hold clones of one registry.
#[derive(Clone, Default)]
pub struct AuthSignalRegistry {
    waiters: Arc<DashMap<AuditId, PendingAuth>>,
    next_token: Arc<AtomicU64>,
}

impl fmt::Debug for AuthSignalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSignalRegistry")
            .field("pending", &self.waiters.len())
            .finish_non_exhaustive()
    }
}

impl AuthSignalRegistry {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a waiter for `audit_id` until `confirm` or `deadline`.
    ///
    /// Registering twice for the same audit supersedes the earlier waiter.
    pub fn register_waiter(&self, audit_id: AuditId, deadline: Instant) -> AuthWaiter {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        if self
            .waiters
            .insert(audit_id, PendingAuth { token, confirm: tx })
            .is_some()
        {
            debug!(%audit_id, "superseding pending authentication waiter");
        }

        AuthWaiter {
            registry: self.clone(),
            audit_id,
            token,
            deadline,
            receiver: rx,
        }
    }

    /// Resolve the waiter for `audit_id`. Returns false when none is pending.
    pub fn confirm(&self, audit_id: AuditId) -> bool {
        match self.waiters.remove(&audit_id) {
            Some((_, pending)) => pending.confirm.send(()).is_ok(),
            None => false,
        }
    }

    /// Whether a waiter is currently parked for `audit_id`.
    pub fn is_waiting(&self, audit_id: AuditId) -> bool {
        self.waiters.contains_key(&audit_id)
    }

    /// Number of parked waiters.
    pub fn pending_count(&self) -> usize {
        self.waiters.len()
    }

    fn release(&self, audit_id: AuditId, token: u64) {
        self.waiters
            .remove_if(&audit_id, |_, pending| pending.token == token);
    }
}

/// Handle returned by [`AuthSignalRegistry::register_waiter`].
///
/// Dropping it without waiting removes the registry entry.
pub struct AuthWaiter {
    registry: AuthSignalRegistry,
    audit_id: AuditId,
    token: u64,
    deadline: Instant,
    receiver: oneshot::Receiver<()>,
}

impl fmt::Debug for AuthWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthWaiter")
            .field("audit_id", &self.audit_id)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl AuthWaiter {
    /// Audit this waiter belongs to.
    pub fn audit_id(&self) -> AuditId {
        self.audit_id
    }

    /// Block until confirmed, superseded or past the deadline.
    pub async fn wait(mut self) -> Result<(), AuthSignalError> {
        match timeout_at(self.deadline, &mut self.receiver).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(AuthSignalError::Superseded),
            Err(_) => {
                self.registry.release(self.audit_id, self.token);
                // A confirm racing the deadline may already have sent.
                self.receiver.close();
                match self.receiver.try_recv() {
                    Ok(()) => Ok(()),
                    Err(_) => Err(AuthSignalError::Timeout),
                }
            }
        }
    }
}

impl Drop for AuthWaiter {
    fn drop(&mut self) {
        self.registry.release(self.audit_id, self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn confirm_before_deadline_resolves() {
        let registry = AuthSignalRegistry::new();
        let id = AuditId::new();
        let waiter =
            registry.register_waiter(id, Instant::now() + Duration::from_secs(300));
        let task = tokio::spawn(waiter.wait());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(registry.is_waiting(id));
        assert!(registry.confirm(id));
        assert_eq!(task.await.unwrap(), Ok(()));

        assert!(!registry.confirm(id), "second confirm is a no-op");
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_times_out_and_removes_entry() {
        let registry = AuthSignalRegistry::new();
        let id = AuditId::new();
        let waiter =
            registry.register_waiter(id, Instant::now() + Duration::from_secs(300));

        let result = waiter.wait().await;
        assert_eq!(result, Err(AuthSignalError::Timeout));
        assert!(!registry.is_waiting(id));
        assert!(!registry.confirm(id));
    }

    #[tokio::test]
    async fn unknown_id_is_not_confirmed() {
        let registry = AuthSignalRegistry::new();
        assert!(!registry.confirm(AuditId::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn registries_are_independent() {
        let first = AuthSignalRegistry::new();
        let second = AuthSignalRegistry::new();
        let id = AuditId::new();
        let _waiter = first.register_waiter(id, Instant::now() + Duration::from_secs(5));

        assert!(!second.confirm(id));
        assert!(first.is_waiting(id));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_waiter_supersedes_older() {
        let registry = AuthSignalRegistry::new();
        let id = AuditId::new();
        let deadline = Instant::now() + Duration::from_secs(60);
        let old = registry.register_waiter(id, deadline);
        let new = registry.register_waiter(id, deadline);

        assert_eq!(old.wait().await, Err(AuthSignalError::Superseded));
        // The superseded waiter must not evict the live entry.
        assert!(registry.is_waiting(id));
        assert!(registry.confirm(id));
        assert_eq!(new.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn dropped_waiter_releases_entry() {
        let registry = AuthSignalRegistry::new();
        let id = AuditId::new();
        let waiter = registry.register_waiter(id, Instant::now() + Duration::from_secs(5));
        drop(waiter);
        assert!(!registry.is_waiting(id));
    }
}
