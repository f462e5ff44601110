use thiserror::Error;
use uuid::Uuid;

use crate::types::{AccessLevel, Action, Role};

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Access denied: role `{role}` has `{level}` on `{resource}`, cannot {action}")]
    AccessDenied {
        role: Role,
        resource: String,
        action: Action,
        level: AccessLevel,
    },

    #[error("User {0} is inactive")]
    InactiveUser(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Errors the caller can fix by correcting its input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::Conflict(_) | CoreError::NotFound(_)
        )
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}
