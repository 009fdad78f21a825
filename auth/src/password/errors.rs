use thiserror::Error;

/// Error type for password operations.
#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Password verification failed: {0}")]
    VerificationFailed(String),
}

/// A rule of the password policy that a candidate password breaks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("This password is too short. It must contain at least {min} characters.")]
    TooShort { min: usize },

    #[error("This password is entirely numeric.")]
    EntirelyNumeric,

    #[error("This password is too common.")]
    TooCommon,

    #[error("The password is too similar to the email address.")]
    TooSimilar,
}
