use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::payload::ProfilePayload;
use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;
use crate::profile::models::ProfileView;

pub async fn create_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    ProfilePayload(payload): ProfilePayload,
) -> Result<ApiSuccess<ProfileView>, ApiError> {
    state
        .profile_service
        .create(&current.identity, payload)
        .await
        .map_err(ApiError::from)
        .map(|view| ApiSuccess::new(StatusCode::CREATED, view))
}
