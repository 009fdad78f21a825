use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use super::required;
use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::domain::fields::FieldErrors;
use crate::inbound::http::router::AppState;
use crate::password::models::RequestResetCommand;

pub const RESET_REQUESTED: &str = "Password reset link sent to email.";

/// Always answers with the same body, known email or not.
pub async fn request_password_reset(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RequestResetRequestBody>, ApiError>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let mut errors = FieldErrors::new();
    let email = required(&mut errors, "email", body.email);
    errors.into_result()?;

    state
        .password_service
        .request_reset(RequestResetCommand {
            email: email.unwrap_or_default(),
        })
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, MessageData::new(RESET_REQUESTED)))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestResetRequestBody {
    email: Option<String>,
}
