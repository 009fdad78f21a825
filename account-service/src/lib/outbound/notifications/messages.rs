use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::notification::Notification;

/// Wire format of a notification on the mail topic.
///
/// The mail worker renders `template` with `context` and sends it to
/// `recipient`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub message_id: String,
    pub template: String,
    pub subject: String,
    pub recipient: String,
    pub context: Value,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationMessage {
    fn from(notification: &Notification) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            template: notification.template.clone(),
            subject: notification.subject.clone(),
            recipient: notification.recipient.clone(),
            context: notification.context.clone(),
            created_at: Utc::now(),
        }
    }
}
