use serde::Serialize;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::session::EffectiveSession;
use crate::session::SessionResolver;

/// Authentication coordinator combining password verification, token
/// issuing and session resolution over one signing secret.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    jwt_handler: JwtHandler,
    session_resolver: SessionResolver,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

impl Authenticator {
    /// # Arguments
    /// * `jwt_secret` - Secret key for token signing, from configuration
    pub fn new(jwt_secret: &[u8]) -> Self {
        let jwt_handler = JwtHandler::new(jwt_secret);

        Self {
            password_hasher: PasswordHasher::new(),
            session_resolver: SessionResolver::new(jwt_handler.clone()),
            jwt_handler,
        }
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a password without issuing anything.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Stored hash is unusable
    pub fn verify_password(
        &self,
        password: &str,
        stored_hash: &str,
    ) -> Result<(), AuthenticationError> {
        if self.password_hasher.verify(password, stored_hash)? {
            Ok(())
        } else {
            Err(AuthenticationError::InvalidCredentials)
        }
    }

    /// Sign a token without password verification.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn generate_token<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        self.jwt_handler.encode(claims)
    }

    /// Validate and decode a token.
    ///
    /// # Errors
    /// * `JwtError` - Signature, expiry or payload check failed
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.jwt_handler.decode(token)
    }

    /// Effective session of a request; see [`SessionResolver::resolve`].
    pub fn resolve_session(
        &self,
        authorization: Option<&str>,
        cookie_session: Option<&str>,
    ) -> EffectiveSession {
        self.session_resolver.resolve(authorization, cookie_session)
    }
}
