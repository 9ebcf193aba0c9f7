use std::fmt::{self, Display};

use crate::audit::AuditStatus;

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidId(String),
    InvalidUrl(String),
    MissingField(&'static str),
    InvalidTransition { from: AuditStatus, to: AuditStatus },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidId(raw) => write!(f, "invalid id: {raw}"),
            ModelError::InvalidUrl(raw) => write!(f, "invalid url: {raw}"),
            ModelError::MissingField(field) => {
                write!(f, "missing required field: {field}")
            }
            ModelError::InvalidTransition { from, to } => {
                write!(f, "invalid audit transition {from} -> {to}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
