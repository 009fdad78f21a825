use thiserror::Error;

/// Error type for token operations.
///
/// Decoding distinguishes the failed check so that callers can log it;
/// anything crossing a trust boundary must collapse these into a single
/// unauthenticated outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is expired")]
    Expired,

    #[error("Token is malformed: {0}")]
    Malformed(String),
}
