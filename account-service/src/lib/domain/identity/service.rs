use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::Claims;
use auth::PasswordPolicy;
use chrono::Duration;
use chrono::Utc;
use serde_json::json;

use crate::domain::fields::FieldErrors;
use crate::domain::notification::dispatch_detached;
use crate::domain::notification::Notification;
use crate::domain::notification::NotificationDispatcher;
use crate::domain::notification::VERIFY_EMAIL_TEMPLATE;
use crate::identity::errors::IdentityError;
use crate::identity::models::AuthenticatedSession;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::models::LoginCommand;
use crate::identity::models::LoginOutcome;
use crate::identity::models::RegisterCommand;
use crate::identity::models::RoleFlags;
use crate::identity::models::Session;
use crate::identity::models::SessionId;
use crate::identity::models::UserId;
use crate::identity::models::VerifyEmailCommand;
use crate::identity::ports::AccountServicePort;
use crate::identity::ports::IdentityRepository;
use crate::identity::ports::SessionStore;

pub const EMAIL_VERIFICATION_PURPOSE: &str = "email_verification";

/// Lifetimes and link targets used by account operations.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub token_ttl: Duration,
    pub session_ttl: Duration,
    pub verification_ttl: Duration,
    /// Base of links sent by email, without trailing slash
    pub frontend_url: String,
}

/// Domain service implementation for registration, login and sessions.
pub struct AccountService<IR, SS, ND>
where
    IR: IdentityRepository,
    SS: SessionStore,
    ND: NotificationDispatcher + ?Sized,
{
    identities: Arc<IR>,
    sessions: Arc<SS>,
    notifier: Arc<ND>,
    authenticator: Arc<Authenticator>,
    password_policy: PasswordPolicy,
    settings: AccountSettings,
}

impl<IR, SS, ND> AccountService<IR, SS, ND>
where
    IR: IdentityRepository,
    SS: SessionStore,
    ND: NotificationDispatcher + ?Sized,
{
    /// # Arguments
    /// * `identities` - Credential store
    /// * `sessions` - Session records
    /// * `notifier` - Outbound email dispatcher
    /// * `authenticator` - Password hashing and token signing
    /// * `settings` - Lifetimes and link base
    pub fn new(
        identities: Arc<IR>,
        sessions: Arc<SS>,
        notifier: Arc<ND>,
        authenticator: Arc<Authenticator>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            identities,
            sessions,
            notifier,
            authenticator,
            password_policy: PasswordPolicy::default(),
            settings: AccountSettings {
                frontend_url: settings.frontend_url.trim_end_matches('/').to_string(),
                ..settings
            },
        }
    }

    fn verification_link(&self, identity: &Identity) -> Result<String, IdentityError> {
        let claims = Claims::for_purpose(
            identity.id,
            EMAIL_VERIFICATION_PURPOSE,
            self.settings.verification_ttl,
        )
        .with_extra("email", identity.email.as_str());

        let token = self
            .authenticator
            .generate_token(&claims)
            .map_err(|e| IdentityError::Token(e.to_string()))?;

        Ok(format!(
            "{}/verify-email/?uid={}&token={}",
            self.settings.frontend_url, identity.id, token
        ))
    }

    fn session_claims(&self, identity: &Identity, session: &Session) -> Claims {
        let token_expiry = Utc::now() + self.settings.token_ttl;
        let expires_at = token_expiry.min(session.expires_at);

        let claims = Claims::for_session(identity.id, session.id, expires_at)
            .with_extra("email", identity.email.as_str());

        match identity.roles.classify() {
            Ok(role) => claims.with_extra("role", role.as_str()),
            Err(_) => claims,
        }
    }
}

#[async_trait]
impl<IR, SS, ND> AccountServicePort for AccountService<IR, SS, ND>
where
    IR: IdentityRepository,
    SS: SessionStore,
    ND: NotificationDispatcher + ?Sized,
{
    async fn register(&self, command: RegisterCommand) -> Result<Identity, IdentityError> {
        let violations = self
            .password_policy
            .check(&command.password, command.email.as_str());
        if !violations.is_empty() {
            let mut errors = FieldErrors::new();
            for violation in violations {
                errors.add("password", violation.to_string());
            }
            return Err(IdentityError::Validation(errors));
        }

        let password_hash = self.authenticator.hash_password(&command.password)?;

        let identity = Identity {
            id: UserId::new(),
            email: command.email,
            full_name: command.full_name,
            phone: None,
            password_hash,
            roles: RoleFlags::from(command.role),
            email_verified: false,
            created_at: Utc::now(),
        };

        let created = self.identities.create(identity).await?;
        tracing::info!(user_id = %created.id, role = %command.role, "Identity registered");

        let link = self.verification_link(&created)?;
        let notification = Notification::new(
            VERIFY_EMAIL_TEMPLATE,
            "Verify your email address",
            &created.email,
            json!({
                "user_name": created.full_name.as_str(),
                "verification_link": link,
            }),
        );
        dispatch_detached(&self.notifier, notification);

        Ok(created)
    }

    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, IdentityError> {
        let email = EmailAddress::new(command.email).map_err(|_| IdentityError::InvalidCredentials)?;

        let identity = self
            .identities
            .find_by_email(&email)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        self.authenticator
            .verify_password(&command.password, &identity.password_hash)
            .map_err(|e| match e {
                AuthenticationError::InvalidCredentials => IdentityError::InvalidCredentials,
                other => IdentityError::Password(other.to_string()),
            })?;

        let session = self
            .sessions
            .create(Session::start(identity.id, self.settings.session_ttl))
            .await?;

        let access_token = self
            .authenticator
            .generate_token(&self.session_claims(&identity, &session))
            .map_err(|e| IdentityError::Token(e.to_string()))?;

        tracing::info!(user_id = %identity.id, session_id = %session.id, "Session opened");

        Ok(LoginOutcome {
            identity,
            session,
            access_token,
        })
    }

    async fn logout(&self, session_id: &SessionId) -> Result<(), IdentityError> {
        self.sessions.delete(session_id).await?;
        tracing::info!(session_id = %session_id, "Session closed");
        Ok(())
    }

    async fn verify_email(&self, command: VerifyEmailCommand) -> Result<(), IdentityError> {
        let user_id =
            UserId::from_string(&command.uid).map_err(|_| IdentityError::InvalidToken)?;

        let claims = self
            .authenticator
            .validate_token(&command.token)
            .map_err(|e| {
                tracing::debug!(reason = %e, "Verification token rejected");
                IdentityError::InvalidToken
            })?;

        let subject = claims
            .sub
            .as_deref()
            .and_then(|sub| UserId::from_string(sub).ok());
        if !claims.has_purpose(EMAIL_VERIFICATION_PURPOSE) || subject != Some(user_id) {
            return Err(IdentityError::InvalidToken);
        }

        let identity = self
            .identities
            .find_by_id(&user_id)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        // A link issued for an earlier address must not verify the current one.
        if claims.extra_str("email") != Some(identity.email.as_str()) {
            return Err(IdentityError::InvalidToken);
        }

        if identity.email_verified {
            return Ok(());
        }

        self.identities.mark_email_verified(&identity.id).await?;
        tracing::info!(user_id = %identity.id, "Email verified");

        Ok(())
    }

    async fn load_session(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthenticatedSession>, IdentityError> {
        let Ok(session_id) = SessionId::from_string(session_id) else {
            return Ok(None);
        };

        let Some(session) = self.sessions.load(&session_id).await? else {
            return Ok(None);
        };

        let identity = self.identities.find_by_id(&session.user_id).await?;

        Ok(identity.map(|identity| AuthenticatedSession { session, identity }))
    }
}
