use thiserror::Error;

use crate::domain::fields::FieldErrors;
use crate::identity::errors::IdentityError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResetTokenError {
    #[error("Malformed reset token")]
    Malformed,
}

/// Top-level error for password change and reset
#[derive(Debug, Clone, Error)]
pub enum PasswordLifecycleError {
    /// Unknown, consumed, expired or forged reset token; never says which
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Password error: {0}")]
    Password(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<ResetTokenError> for PasswordLifecycleError {
    fn from(_: ResetTokenError) -> Self {
        PasswordLifecycleError::InvalidToken
    }
}

impl From<auth::PasswordError> for PasswordLifecycleError {
    fn from(err: auth::PasswordError) -> Self {
        PasswordLifecycleError::Password(err.to_string())
    }
}

/// Identity lookups during password flows only fail on infrastructure.
impl From<IdentityError> for PasswordLifecycleError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(errors) => PasswordLifecycleError::Validation(errors),
            IdentityError::DatabaseError(message) => PasswordLifecycleError::DatabaseError(message),
            other => PasswordLifecycleError::Unknown(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for PasswordLifecycleError {
    fn from(err: anyhow::Error) -> Self {
        PasswordLifecycleError::Unknown(err.to_string())
    }
}
