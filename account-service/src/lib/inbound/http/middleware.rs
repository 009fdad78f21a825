use axum::extract::Request;
use axum::extract::State;
use axum::http;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;

use super::handlers::ApiError;
use crate::identity::models::AuthenticatedSession;
use crate::inbound::http::router::AppState;

/// Extension holding the session a request acts under.
///
/// Present only when a bearer token or the session cookie named a live
/// session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedSession);

/// Resolves the effective session of every request.
///
/// A valid bearer token overrides the cookie. Bad or expired credentials
/// leave the request anonymous; only protected routes turn that into 401.
pub async fn resolve_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let cookie_session = jar.get(&state.cookie_name).map(|cookie| cookie.value());

    let effective = state
        .authenticator
        .resolve_session(authorization, cookie_session);

    if let Some(session_id) = effective.session_id() {
        match state.account_service.load_session(session_id).await? {
            Some(current) => {
                tracing::debug!(user_id = %current.identity.id, "Request authenticated");
                req.extensions_mut().insert(CurrentUser(current));
            }
            None => tracing::debug!("Presented session is unknown or expired"),
        }
    }

    Ok(next.run(req).await)
}

/// Route layer for endpoints that need an authenticated session.
pub async fn require_authentication(req: Request, next: Next) -> Result<Response, ApiError> {
    if req.extensions().get::<CurrentUser>().is_none() {
        return Err(ApiError::Unauthorized(
            "Authentication credentials were not provided.".to_string(),
        ));
    }

    Ok(next.run(req).await)
}
