use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde::Serialize;

use super::required;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::fields::FieldErrors;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;
use crate::password::models::ChangePasswordCommand;

pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    WithRejection(Json(body), _): WithRejection<Json<ChangePasswordRequestBody>, ApiError>,
) -> Result<ApiSuccess<ChangePasswordResponseData>, ApiError> {
    state
        .password_service
        .change_password(&current, body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|_| {
            ApiSuccess::new(
                StatusCode::OK,
                ChangePasswordResponseData {
                    detail: "Password updated successfully".to_string(),
                },
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangePasswordRequestBody {
    old_password: Option<String>,
    new_password: Option<String>,
}

impl ChangePasswordRequestBody {
    fn try_into_command(self) -> Result<ChangePasswordCommand, FieldErrors> {
        let mut errors = FieldErrors::new();
        let old_password = required(&mut errors, "old_password", self.old_password);
        let new_password = required(&mut errors, "new_password", self.new_password);

        match (old_password, new_password) {
            (Some(old_password), Some(new_password)) => Ok(ChangePasswordCommand {
                old_password,
                new_password,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangePasswordResponseData {
    pub detail: String,
}
