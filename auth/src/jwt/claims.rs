use std::collections::HashMap;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Claims carried by every token this library issues.
///
/// Session tokens carry `sessionid`; single-purpose tokens (email verification
/// and the like) carry `purpose` instead and are never accepted as sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user identifier)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration time (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Server-side session the token stands for
    #[serde(rename = "sessionid", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Restricts a non-session token to one flow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// Additional custom fields (flattened into token)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims for a login session.
    ///
    /// # Arguments
    /// * `user_id` - Identity the session belongs to
    /// * `session_id` - Server-side session identifier
    /// * `expires_at` - Token expiry, normally the session expiry
    pub fn for_session(
        user_id: impl ToString,
        session_id: impl ToString,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: Some(user_id.to_string()),
            exp: Some(expires_at.timestamp()),
            iat: Some(Utc::now().timestamp()),
            session_id: Some(session_id.to_string()),
            ..Self::default()
        }
    }

    /// Claims for a single-purpose token such as an email verification link.
    pub fn for_purpose(subject: impl ToString, purpose: impl ToString, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: Some(subject.to_string()),
            exp: Some((now + ttl).timestamp()),
            iat: Some(now.timestamp()),
            purpose: Some(purpose.to_string()),
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, sub: impl ToString) -> Self {
        self.sub = Some(sub.to_string());
        self
    }

    /// Set expiration (Unix timestamp).
    pub fn with_expiration(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    pub fn with_session(mut self, session_id: impl ToString) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    /// Add a custom field.
    pub fn with_extra(mut self, key: impl ToString, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.extra.insert(key.to_string(), json_value);
        }
        self
    }

    /// Read a custom string field.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }

    /// Session identifier, only for tokens that are not bound to a purpose.
    pub fn session(&self) -> Option<&str> {
        match self.purpose {
            Some(_) => None,
            None => self.session_id.as_deref(),
        }
    }

    pub fn has_purpose(&self, purpose: &str) -> bool {
        self.purpose.as_deref() == Some(purpose)
    }

    /// Check if token is expired.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp.map_or(false, |exp| exp < current_timestamp)
    }
}

impl Default for Claims {
    fn default() -> Self {
        Self {
            sub: None,
            exp: None,
            iat: None,
            session_id: None,
            purpose: None,
            extra: HashMap::new(),
        }
    }
}
