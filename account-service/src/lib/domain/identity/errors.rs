use thiserror::Error;

use crate::domain::fields::FieldErrors;
use crate::identity::models::Role;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionIdError {
    #[error("Invalid session id: {0}")]
    InvalidFormat(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Enter a valid email address. ({0})")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FullNameError {
    #[error("This field may not be blank.")]
    Empty,

    #[error("Ensure this field has no more than {max} characters (got {actual}).")]
    TooLong { max: usize, actual: usize },
}

/// Role resolution failures. All of them mean the identity has no usable role.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Unknown role: {0}")]
    Unknown(String),

    #[error("User has both doctor and patient roles")]
    Ambiguous,

    #[error("User has no role")]
    Missing,

    #[error("Expected a {expected} profile, found a {found} profile")]
    Mismatch { expected: Role, found: Role },
}

/// Top-level error for identity, login and session operations
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    #[error("Invalid user ID: {0}")]
    InvalidUserId(#[from] UserIdError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid full name: {0}")]
    InvalidFullName(#[from] FullNameError),

    #[error("Invalid role: {0}")]
    InvalidRole(#[from] RoleError),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Verification link unusable; deliberately carries no reason
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Password error: {0}")]
    Password(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for IdentityError {
    fn from(err: anyhow::Error) -> Self {
        IdentityError::Unknown(err.to_string())
    }
}

impl From<auth::PasswordError> for IdentityError {
    fn from(err: auth::PasswordError) -> Self {
        IdentityError::Password(err.to_string())
    }
}
