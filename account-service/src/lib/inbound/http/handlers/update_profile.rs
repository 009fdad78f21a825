use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::payload::ProfilePayload;
use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;
use crate::profile::models::ProfileView;

/// Partial update; serves both PUT and PATCH.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    ProfilePayload(payload): ProfilePayload,
) -> Result<ApiSuccess<ProfileView>, ApiError> {
    state
        .profile_service
        .update(&current.identity, payload)
        .await
        .map_err(ApiError::from)
        .map(|view| ApiSuccess::new(StatusCode::OK, view))
}
