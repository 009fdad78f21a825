use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::identity::models::UserId;
use crate::password::errors::ResetTokenError;

/// Password reset ticket identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketId(pub Uuid);

impl TicketId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Single-use credential authorizing one password reset.
///
/// Only a hash of the secret is kept; the secret itself exists only in the
/// link sent to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTicket {
    pub id: TicketId,
    pub user_id: UserId,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Usable,
    Consumed,
    Expired,
}

impl ResetTicket {
    pub fn issue(user_id: UserId, secret_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            id: TicketId::new(),
            user_id,
            secret_hash,
            created_at: now,
            expires_at: now + ttl,
            consumed_at: None,
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> TicketStatus {
        if self.consumed_at.is_some() {
            TicketStatus::Consumed
        } else if self.expires_at <= now {
            TicketStatus::Expired
        } else {
            TicketStatus::Usable
        }
    }
}

/// Token handed to the user: `{ticket_id}.{secret}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub ticket_id: TicketId,
    pub secret: String,
}

impl fmt::Display for ResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.ticket_id, self.secret)
    }
}

impl FromStr for ResetToken {
    type Err = ResetTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, secret) = s.trim().split_once('.').ok_or(ResetTokenError::Malformed)?;

        let ticket_id = Uuid::parse_str(id)
            .map(TicketId)
            .map_err(|_| ResetTokenError::Malformed)?;

        if secret.is_empty() || !secret.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ResetTokenError::Malformed);
        }

        Ok(Self {
            ticket_id,
            secret: secret.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct RequestResetCommand {
    pub email: String,
}

#[derive(Debug)]
pub struct ConfirmResetCommand {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug)]
pub struct ChangePasswordCommand {
    pub old_password: String,
    pub new_password: String,
}
