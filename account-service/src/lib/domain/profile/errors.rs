use thiserror::Error;

use crate::domain::fields::FieldErrors;
use crate::identity::errors::RoleError;

/// Top-level error for profile operations
#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    /// Role flags do not resolve to exactly one role
    #[error("Invalid role: {0}")]
    InvalidRole(#[from] RoleError),

    /// Role is valid but the role-specific record does not exist
    #[error("Profile is incomplete")]
    IncompleteProfile,

    #[error("No fields provided")]
    EmptyPayload,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Profile already exists")]
    AlreadyExists,

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<FieldErrors> for ProfileError {
    fn from(errors: FieldErrors) -> Self {
        ProfileError::Validation(errors)
    }
}

impl From<anyhow::Error> for ProfileError {
    fn from(err: anyhow::Error) -> Self {
        ProfileError::Unknown(err.to_string())
    }
}
