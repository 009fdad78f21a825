use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;

const BEARER_PREFIX: &str = "Bearer ";

/// Where the effective session identifier of a request came from.
///
/// Produced once per request and consumed by whatever loads sessions;
/// the request itself is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveSession {
    /// Session id embedded in a valid bearer token
    Bearer(String),
    /// Session id read from the session cookie
    Cookie(String),
    Anonymous,
}

impl EffectiveSession {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            EffectiveSession::Bearer(id) | EffectiveSession::Cookie(id) => Some(id),
            EffectiveSession::Anonymous => None,
        }
    }
}

/// Resolves the session a request acts under.
///
/// A verified bearer token wins over the cookie. Any bearer failure
/// (bad signature, expiry, malformed payload, missing session claim) falls
/// through to the cookie untouched; the reason is only logged.
#[derive(Clone)]
pub struct SessionResolver {
    codec: JwtHandler,
}

impl SessionResolver {
    pub fn new(codec: JwtHandler) -> Self {
        Self { codec }
    }

    /// # Arguments
    /// * `authorization` - Raw `Authorization` header value, if any
    /// * `cookie_session` - Session id carried by the session cookie, if any
    pub fn resolve(
        &self,
        authorization: Option<&str>,
        cookie_session: Option<&str>,
    ) -> EffectiveSession {
        let from_bearer = authorization
            .and_then(|header| header.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .and_then(|token| match self.session_from_token(token) {
                Ok(session_id) => Some(session_id),
                Err(reason) => {
                    tracing::debug!(reason = %reason, "Bearer token rejected, falling back to cookie");
                    None
                }
            });

        if let Some(session_id) = from_bearer {
            return EffectiveSession::Bearer(session_id);
        }

        match cookie_session.filter(|id| !id.is_empty()) {
            Some(session_id) => EffectiveSession::Cookie(session_id.to_string()),
            None => EffectiveSession::Anonymous,
        }
    }

    fn session_from_token(&self, token: &str) -> Result<String, JwtError> {
        let claims: Claims = self.codec.decode(token)?;

        claims
            .session()
            .map(str::to_string)
            .ok_or_else(|| JwtError::Malformed("token carries no session".to_string()))
    }
}
