use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use super::login::UserData;
use super::required;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::fields::FieldErrors;
use crate::identity::models::EmailAddress;
use crate::identity::models::FullName;
use crate::identity::models::RegisterCommand;
use crate::identity::models::Role;
use crate::inbound::http::router::AppState;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequestBody>, ApiError>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .account_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref identity| ApiSuccess::new(StatusCode::CREATED, identity.into()))
}

/// HTTP request body for registration (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequestBody {
    email: Option<String>,
    password: Option<String>,
    full_name: Option<String>,
    role: Option<String>,
}

impl RegisterRequestBody {
    /// Every field is checked so the caller sees all problems at once.
    fn try_into_command(self) -> Result<RegisterCommand, FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = required(&mut errors, "email", self.email).and_then(|email| {
            EmailAddress::new(email)
                .map_err(|e| errors.add("email", e.to_string()))
                .ok()
        });
        let full_name = required(&mut errors, "full_name", self.full_name).and_then(|name| {
            FullName::new(name)
                .map_err(|e| errors.add("full_name", e.to_string()))
                .ok()
        });
        let role = required(&mut errors, "role", self.role).and_then(|role| {
            role.parse::<Role>()
                .map_err(|_| errors.add("role", format!("\"{}\" is not a valid choice.", role)))
                .ok()
        });
        let password = required(&mut errors, "password", self.password);

        match (email, full_name, role, password) {
            (Some(email), Some(full_name), Some(role), Some(password)) if errors.is_empty() => {
                Ok(RegisterCommand {
                    email,
                    full_name,
                    password,
                    role,
                })
            }
            _ => Err(errors),
        }
    }
}
