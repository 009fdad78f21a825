//! Outbound email notifications.
//!
//! The request path never waits on delivery: [`dispatch_detached`] hands the
//! notification to a background task and only logs the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::identity::models::EmailAddress;

pub const VERIFY_EMAIL_TEMPLATE: &str = "emails/verify_email.html";
pub const PASSWORD_RESET_TEMPLATE: &str = "emails/password_reset.html";

/// A templated email for one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub template: String,
    pub subject: String,
    pub recipient: String,
    pub context: Value,
}

impl Notification {
    pub fn new(
        template: &str,
        subject: &str,
        recipient: &EmailAddress,
        context: Value,
    ) -> Self {
        Self {
            template: template.to_string(),
            subject: subject.to_string(),
            recipient: recipient.as_str().to_string(),
            context,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Failed to serialize notification: {0}")]
    SerializationFailed(String),

    #[error("Failed to publish notification: {0}")]
    PublishFailed(String),
}

/// Asynchronous mail dispatcher.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync + 'static {
    /// Hand a notification over for delivery.
    ///
    /// # Errors
    /// * `SerializationFailed` - Notification could not be encoded
    /// * `PublishFailed` - Broker rejected or timed out
    async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// Fire-and-forget dispatch. Failures are logged, never returned.
pub fn dispatch_detached<ND>(dispatcher: &Arc<ND>, notification: Notification)
where
    ND: NotificationDispatcher + ?Sized,
{
    let dispatcher = Arc::clone(dispatcher);

    tokio::spawn(async move {
        match dispatcher.dispatch(&notification).await {
            Ok(()) => tracing::debug!(
                template = %notification.template,
                "Notification dispatched"
            ),
            Err(e) => tracing::error!(
                template = %notification.template,
                "Failed to dispatch notification: {}",
                e
            ),
        }
    });
}
