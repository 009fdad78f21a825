use std::sync::Arc;

use async_trait::async_trait;
use auth::generate_secret;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::PasswordPolicy;
use chrono::Duration;
use chrono::Utc;
use serde_json::json;

use crate::domain::fields::FieldErrors;
use crate::domain::notification::dispatch_detached;
use crate::domain::notification::Notification;
use crate::domain::notification::NotificationDispatcher;
use crate::domain::notification::PASSWORD_RESET_TEMPLATE;
use crate::identity::models::AuthenticatedSession;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::ports::IdentityRepository;
use crate::identity::ports::SessionStore;
use crate::password::errors::PasswordLifecycleError;
use crate::password::models::ChangePasswordCommand;
use crate::password::models::ConfirmResetCommand;
use crate::password::models::RequestResetCommand;
use crate::password::models::ResetTicket;
use crate::password::models::ResetToken;
use crate::password::models::TicketStatus;
use crate::password::ports::PasswordServicePort;
use crate::password::ports::ResetTicketRepository;

const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct PasswordSettings {
    pub ticket_ttl: Duration,
    /// Base of reset links, without trailing slash
    pub frontend_url: String,
    pub support_email: String,
}

/// Domain service implementation for the password lifecycle.
pub struct PasswordService<IR, TR, SS, ND>
where
    IR: IdentityRepository,
    TR: ResetTicketRepository,
    SS: SessionStore,
    ND: NotificationDispatcher + ?Sized,
{
    identities: Arc<IR>,
    tickets: Arc<TR>,
    sessions: Arc<SS>,
    notifier: Arc<ND>,
    authenticator: Arc<Authenticator>,
    password_policy: PasswordPolicy,
    settings: PasswordSettings,
}

impl<IR, TR, SS, ND> PasswordService<IR, TR, SS, ND>
where
    IR: IdentityRepository,
    TR: ResetTicketRepository,
    SS: SessionStore,
    ND: NotificationDispatcher + ?Sized,
{
    pub fn new(
        identities: Arc<IR>,
        tickets: Arc<TR>,
        sessions: Arc<SS>,
        notifier: Arc<ND>,
        authenticator: Arc<Authenticator>,
        settings: PasswordSettings,
    ) -> Self {
        Self {
            identities,
            tickets,
            sessions,
            notifier,
            authenticator,
            password_policy: PasswordPolicy::default(),
            settings: PasswordSettings {
                frontend_url: settings.frontend_url.trim_end_matches('/').to_string(),
                ..settings
            },
        }
    }

    fn check_policy(
        &self,
        field: &str,
        password: &str,
        email: &EmailAddress,
    ) -> Result<(), PasswordLifecycleError> {
        let mut errors = FieldErrors::new();
        for violation in self.password_policy.check(password, email.as_str()) {
            errors.add(field, violation.to_string());
        }
        errors.into_result().map_err(PasswordLifecycleError::Validation)
    }

    async fn issue_ticket(&self, identity: &Identity) -> Result<(), PasswordLifecycleError> {
        let secret = generate_secret(SECRET_BYTES);
        let secret_hash = self.authenticator.hash_password(&secret)?;

        let ticket = self
            .tickets
            .create(ResetTicket::issue(
                identity.id,
                secret_hash,
                self.settings.ticket_ttl,
            ))
            .await?;

        let token = ResetToken {
            ticket_id: ticket.id,
            secret,
        };
        let reset_link = format!("{}/password-reset/{}/", self.settings.frontend_url, token);

        let notification = Notification::new(
            PASSWORD_RESET_TEMPLATE,
            "Reset your password",
            &identity.email,
            json!({
                "user_name": identity.full_name.as_str(),
                "reset_link": reset_link,
                "support_email": self.settings.support_email,
            }),
        );
        dispatch_detached(&self.notifier, notification);

        tracing::info!(user_id = %identity.id, ticket_id = %ticket.id, "Password reset ticket issued");
        Ok(())
    }
}

#[async_trait]
impl<IR, TR, SS, ND> PasswordServicePort for PasswordService<IR, TR, SS, ND>
where
    IR: IdentityRepository,
    TR: ResetTicketRepository,
    SS: SessionStore,
    ND: NotificationDispatcher + ?Sized,
{
    async fn request_reset(
        &self,
        command: RequestResetCommand,
    ) -> Result<(), PasswordLifecycleError> {
        let Ok(email) = EmailAddress::new(command.email) else {
            return Ok(());
        };

        match self.identities.find_by_email(&email).await? {
            Some(identity) => {
                // Past this point the caller must not learn anything.
                if let Err(e) = self.issue_ticket(&identity).await {
                    tracing::error!(user_id = %identity.id, "Failed to issue reset ticket: {}", e);
                }
            }
            None => {
                // Same hashing cost as the known-email path.
                let _ = self.authenticator.hash_password(&generate_secret(SECRET_BYTES));
                tracing::debug!("Password reset requested for unknown email");
            }
        }

        Ok(())
    }

    async fn confirm_reset(
        &self,
        command: ConfirmResetCommand,
    ) -> Result<(), PasswordLifecycleError> {
        let token: ResetToken = command.token.parse()?;

        let ticket = self
            .tickets
            .find(&token.ticket_id)
            .await?
            .ok_or(PasswordLifecycleError::InvalidToken)?;

        let status = ticket.status(Utc::now());
        if status != TicketStatus::Usable {
            tracing::debug!(ticket_id = %ticket.id, status = ?status, "Reset ticket rejected");
            return Err(PasswordLifecycleError::InvalidToken);
        }

        self.authenticator
            .verify_password(&token.secret, &ticket.secret_hash)
            .map_err(|e| match e {
                AuthenticationError::InvalidCredentials => PasswordLifecycleError::InvalidToken,
                other => PasswordLifecycleError::Password(other.to_string()),
            })?;

        let identity = self
            .identities
            .find_by_id(&ticket.user_id)
            .await?
            .ok_or(PasswordLifecycleError::InvalidToken)?;

        // A rejected password leaves the ticket usable for another attempt.
        self.check_policy("new_password", &command.new_password, &identity.email)?;

        let password_hash = self.authenticator.hash_password(&command.new_password)?;

        if !self
            .tickets
            .redeem(&ticket.id, &identity.id, &password_hash)
            .await?
        {
            return Err(PasswordLifecycleError::InvalidToken);
        }

        tracing::info!(user_id = %identity.id, ticket_id = %ticket.id, "Password reset completed");
        Ok(())
    }

    async fn change_password(
        &self,
        current: &AuthenticatedSession,
        command: ChangePasswordCommand,
    ) -> Result<(), PasswordLifecycleError> {
        let identity = &current.identity;

        self.authenticator
            .verify_password(&command.old_password, &identity.password_hash)
            .map_err(|e| match e {
                AuthenticationError::InvalidCredentials => PasswordLifecycleError::Validation(
                    FieldErrors::single("old_password", "Old password is incorrect."),
                ),
                other => PasswordLifecycleError::Password(other.to_string()),
            })?;

        self.check_policy("new_password", &command.new_password, &identity.email)?;

        let password_hash = self.authenticator.hash_password(&command.new_password)?;
        self.identities
            .update_password(&identity.id, &password_hash)
            .await?;

        let revoked = self
            .sessions
            .delete_for_user(&identity.id, Some(current.session.id))
            .await?;

        tracing::info!(user_id = %identity.id, revoked_sessions = revoked, "Password changed");
        Ok(())
    }
}
