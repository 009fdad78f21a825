use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::identity::errors::EmailError;
use crate::identity::errors::FullNameError;
use crate::identity::errors::RoleError;
use crate::identity::errors::SessionIdError;
use crate::identity::errors::UserIdError;

/// Identity aggregate entity.
///
/// Owned by the credential store; every other aggregate refers to it by id.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: UserId,
    pub email: EmailAddress,
    pub full_name: FullName,
    pub phone: Option<String>,
    pub password_hash: String,
    pub roles: RoleFlags,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates format with an RFC 5322 parser and lowercases the domain part,
/// so lookups do not depend on how the domain was typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let email = email.trim();
        email_address::EmailAddress::from_str(email)
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))?;

        let normalized = match email.rsplit_once('@') {
            Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
            None => email.to_string(),
        };

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn local_part(&self) -> &str {
        self.0.rsplit_once('@').map_or(&self.0, |(local, _)| local)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display name of a user, 1-150 characters after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName(String);

impl FullName {
    const MAX_LENGTH: usize = 150;

    /// # Errors
    /// * `Empty` - Nothing left after trimming
    /// * `TooLong` - Longer than 150 characters
    pub fn new(name: impl Into<String>) -> Result<Self, FullNameError> {
        let name = name.into().trim().to_string();
        let length = name.chars().count();

        if length == 0 {
            Err(FullNameError::Empty)
        } else if length > Self::MAX_LENGTH {
            Err(FullNameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The profile variant an identity maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Doctor,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

/// Role flags as stored.
///
/// Storage can hold any combination, so the role is derived on every read
/// and anything but exactly one flag is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleFlags {
    pub is_doctor: bool,
    pub is_patient: bool,
}

impl RoleFlags {
    /// # Errors
    /// * `Ambiguous` - Both flags set
    /// * `Missing` - Neither flag set
    pub fn classify(&self) -> Result<Role, RoleError> {
        match (self.is_doctor, self.is_patient) {
            (true, false) => Ok(Role::Doctor),
            (false, true) => Ok(Role::Patient),
            (true, true) => Err(RoleError::Ambiguous),
            (false, false) => Err(RoleError::Missing),
        }
    }
}

impl From<Role> for RoleFlags {
    fn from(role: Role) -> Self {
        Self {
            is_doctor: role == Role::Doctor,
            is_patient: role == Role::Patient,
        }
    }
}

/// Server-side session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, SessionIdError> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|e| SessionIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Server-tracked login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn start(user_id: UserId, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            id: SessionId::new(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The identity a request acts as, together with the session it came in on.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session: Session,
    pub identity: Identity,
}

#[derive(Debug)]
pub struct RegisterCommand {
    pub email: EmailAddress,
    pub full_name: FullName,
    pub password: String,
    pub role: Role,
}

/// Login input is kept raw: a malformed email must fail like a wrong password.
#[derive(Debug)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct VerifyEmailCommand {
    pub uid: String,
    pub token: String,
}

/// Result of a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub session: Session,
    pub access_token: String,
}
