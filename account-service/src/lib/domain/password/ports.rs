use async_trait::async_trait;

use crate::identity::models::AuthenticatedSession;
use crate::identity::models::UserId;
use crate::password::errors::PasswordLifecycleError;
use crate::password::models::ChangePasswordCommand;
use crate::password::models::ConfirmResetCommand;
use crate::password::models::RequestResetCommand;
use crate::password::models::ResetTicket;
use crate::password::models::TicketId;

/// Port for password change and reset.
#[async_trait]
pub trait PasswordServicePort: Send + Sync + 'static {
    /// Issue a reset ticket and mail its link.
    ///
    /// Succeeds identically whether or not the email is known.
    ///
    /// # Errors
    /// * `DatabaseError` - Identity lookup failed
    async fn request_reset(&self, command: RequestResetCommand)
        -> Result<(), PasswordLifecycleError>;

    /// Consume a reset ticket and replace the password.
    ///
    /// # Errors
    /// * `InvalidToken` - Token unknown, forged, consumed or expired
    /// * `Validation` - New password rejected by the password policy
    async fn confirm_reset(&self, command: ConfirmResetCommand)
        -> Result<(), PasswordLifecycleError>;

    /// Change the password of the acting identity.
    ///
    /// # Errors
    /// * `Validation` - Wrong old password or policy violation
    async fn change_password(
        &self,
        current: &AuthenticatedSession,
        command: ChangePasswordCommand,
    ) -> Result<(), PasswordLifecycleError>;
}

/// Persistence for reset tickets.
#[async_trait]
pub trait ResetTicketRepository: Send + Sync + 'static {
    async fn create(&self, ticket: ResetTicket) -> Result<ResetTicket, PasswordLifecycleError>;

    async fn find(&self, id: &TicketId) -> Result<Option<ResetTicket>, PasswordLifecycleError>;

    /// Atomically consume a usable ticket and apply its effects: store the
    /// new password hash, invalidate the user's other tickets and revoke all
    /// of the user's sessions.
    ///
    /// # Returns
    /// false when the ticket was no longer usable (consumed concurrently or
    /// expired); nothing is written in that case
    async fn redeem(
        &self,
        id: &TicketId,
        user_id: &UserId,
        password_hash: &str,
    ) -> Result<bool, PasswordLifecycleError>;
}
