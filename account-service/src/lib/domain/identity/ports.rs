use async_trait::async_trait;

use crate::identity::errors::IdentityError;
use crate::identity::models::AuthenticatedSession;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::models::LoginCommand;
use crate::identity::models::LoginOutcome;
use crate::identity::models::RegisterCommand;
use crate::identity::models::Session;
use crate::identity::models::SessionId;
use crate::identity::models::UserId;
use crate::identity::models::VerifyEmailCommand;

/// Port for account operations: registration, login and session lookup.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Create an unverified identity and send its verification link.
    ///
    /// # Errors
    /// * `Validation` - Password rejected by the password policy
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<Identity, IdentityError>;

    /// Check credentials, open a session and issue its bearer token.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password
    /// * `DatabaseError` - Database operation failed
    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, IdentityError>;

    /// End a session. Unknown sessions are not an error.
    async fn logout(&self, session_id: &SessionId) -> Result<(), IdentityError>;

    /// Mark an identity verified from a verification link.
    ///
    /// # Errors
    /// * `InvalidToken` - Bad uid, unknown user, bad or expired token
    /// * `DatabaseError` - Database operation failed
    async fn verify_email(&self, command: VerifyEmailCommand) -> Result<(), IdentityError>;

    /// Session-loading collaborator: materialise the identity behind a
    /// session id.
    ///
    /// # Returns
    /// None for unknown, expired or orphaned sessions
    async fn load_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthenticatedSession>, IdentityError>;
}

/// Credential store.
#[async_trait]
pub trait IdentityRepository: Send + Sync + 'static {
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, identity: Identity) -> Result<Identity, IdentityError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<Identity>, IdentityError>;

    async fn find_by_email(&self, email: &EmailAddress)
        -> Result<Option<Identity>, IdentityError>;

    /// # Errors
    /// * `NotFound` - User does not exist
    async fn mark_email_verified(&self, id: &UserId) -> Result<(), IdentityError>;

    /// # Errors
    /// * `NotFound` - User does not exist
    async fn update_password(&self, id: &UserId, password_hash: &str)
        -> Result<(), IdentityError>;
}

/// Server-side session records.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn create(&self, session: Session) -> Result<Session, IdentityError>;

    /// # Returns
    /// The session if it exists and has not expired
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, IdentityError>;

    async fn delete(&self, id: &SessionId) -> Result<(), IdentityError>;

    /// Revoke every session of a user, optionally sparing one.
    ///
    /// # Returns
    /// Number of revoked sessions
    async fn delete_for_user(
        &self,
        user_id: &UserId,
        keep: Option<SessionId>,
    ) -> Result<u64, IdentityError>;
}
