use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::CookieJar;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiSuccess<MessageData>), ApiError> {
    state
        .account_service
        .logout(&current.session.id)
        .await
        .map_err(ApiError::from)?;

    let removal = Cookie::build((state.cookie_name.clone(), "")).path("/");

    Ok((
        jar.remove(removal),
        ApiSuccess::new(StatusCode::OK, MessageData::new("Successfully logged out.")),
    ))
}
