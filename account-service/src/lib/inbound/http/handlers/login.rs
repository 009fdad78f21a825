use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::SameSite;
use axum_extra::extract::CookieJar;
use axum_extra::extract::WithRejection;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::models::Identity;
use crate::identity::models::LoginCommand;
use crate::inbound::http::router::AppState;

/// Open a session. The session id is returned both as the cookie and inside
/// the bearer token.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequestBody>, ApiError>,
) -> Result<(CookieJar, ApiSuccess<LoginResponseData>), ApiError> {
    let outcome = state
        .account_service
        .login(LoginCommand {
            email: body.email,
            password: body.password,
        })
        .await?;

    let cookie = Cookie::build((state.cookie_name.clone(), outcome.session.id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/");

    Ok((
        jar.add(cookie),
        ApiSuccess::new(
            StatusCode::OK,
            LoginResponseData {
                access: outcome.access_token,
                user: (&outcome.identity).into(),
            },
        ),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub access: String,
    pub user: UserData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    /// Absent when the stored role flags are inconsistent
    pub role: Option<String>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for UserData {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.to_string(),
            email: identity.email.as_str().to_string(),
            full_name: identity.full_name.as_str().to_string(),
            phone: identity.phone.clone(),
            role: identity
                .roles
                .classify()
                .ok()
                .map(|role| role.as_str().to_string()),
            is_email_verified: identity.email_verified,
            created_at: identity.created_at,
        }
    }
}
