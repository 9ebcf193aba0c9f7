//! Engine error type.

use std::time::Duration;

use auditr_model::{AuditStatus, ModelError};
use thiserror::Error;

use crate::browser::BrowserError;
use crate::checker::CheckerError;
use crate::store::StoreError;

/// Failures surfaced by the audit engine.
///
/// Page-level navigation and checker failures are normally absorbed into a
/// failed `PageResult`; they only appear here when they hit an audit-level
/// step such as the initial navigation.
#[derive(Error, Debug)]
pub enum AuditError {
    /// No project with that id.
    #[error("project not found")]
    ProjectNotFound,

    /// No audit with that id.
    #[error("audit not found")]
    AuditNotFound,

    /// Nobody confirmed the login before the deadline.
    #[error("authentication timed out after {}", humantime::format_duration(*.0))]
    AuthTimeout(Duration),

    /// `confirm-auth` on an audit in another status.
    #[error("audit is not waiting for authentication")]
    NotAwaitingAuth,

    /// The audit is `waiting-auth` but its waiter is gone.
    #[error("no pending authentication for this audit")]
    AuthNotPending,

    /// Refused while the audit is not terminal.
    #[error("audit is still in progress")]
    AuditInProgress,

    /// A status change the lifecycle forbids.
    #[error("invalid audit transition {from} -> {to}")]
    InvalidTransition {
        /// Status before the attempted change.
        from: AuditStatus,
        /// Requested status.
        to: AuditStatus,
    },

    /// The start page could not be loaded.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A browser call failed underneath.
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// The rule engine failed.
    #[error("accessibility checker error: {0}")]
    Checker(#[from] CheckerError),

    /// Persistence failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Rejected caller input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A bug or missing wiring.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// Shorthand for [`AuditError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        AuditError::Internal(message.into())
    }
}

impl From<ModelError> for AuditError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidTransition { from, to } => {
                AuditError::InvalidTransition { from, to }
            }
            other => AuditError::InvalidInput(other.to_string()),
        }
    }
}

/// Engine result alias.
pub type Result<T> = std::result::Result<T, AuditError>;
