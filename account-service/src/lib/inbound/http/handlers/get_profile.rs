use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;
use crate::profile::models::ProfileView;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
) -> Result<ApiSuccess<ProfileView>, ApiError> {
    state
        .profile_service
        .get(&current.identity)
        .await
        .map_err(ApiError::from)
        .map(|view| ApiSuccess::new(StatusCode::OK, view))
}
