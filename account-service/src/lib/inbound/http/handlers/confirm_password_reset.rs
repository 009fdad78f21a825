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
use crate::password::models::ConfirmResetCommand;

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<ConfirmResetRequestBody>, ApiError>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    state
        .password_service
        .confirm_reset(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|_| {
            ApiSuccess::new(
                StatusCode::OK,
                MessageData::new("Password has been reset successfully."),
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfirmResetRequestBody {
    token: Option<String>,
    new_password: Option<String>,
}

impl ConfirmResetRequestBody {
    fn try_into_command(self) -> Result<ConfirmResetCommand, FieldErrors> {
        let mut errors = FieldErrors::new();
        let token = required(&mut errors, "token", self.token);
        let new_password = required(&mut errors, "new_password", self.new_password);

        match (token, new_password) {
            (Some(token), Some(new_password)) => Ok(ConfirmResetCommand {
                token,
                new_password,
            }),
            _ => Err(errors),
        }
    }
}
