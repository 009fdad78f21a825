use axum::extract::rejection::FormRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::fields::FieldErrors;
use crate::identity::errors::IdentityError;
use crate::password::errors::PasswordLifecycleError;
use crate::profile::errors::ProfileError;

pub mod change_password;
pub mod confirm_password_reset;
pub mod create_profile;
pub mod get_profile;
pub mod login;
pub mod logout;
pub mod payload;
pub mod register;
pub mod request_password_reset;
pub mod update_profile;
pub mod verify_email;

const INVALID_TOKEN: &str = "Invalid or expired token.";

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<T>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub message: String,
}

impl MessageData {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    Validation(FieldErrors),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InternalServerError(msg) => {
                // Infrastructure details stay in the logs.
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody::new("Internal server error."),
                )
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiErrorBody::new(&msg)),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    detail: "Invalid input.".to_string(),
                    errors: Some(errors),
                },
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ApiErrorBody::new(&msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiErrorBody::new(&msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiErrorBody::new(&msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ApiErrorBody::new(&msg)),
        };

        (status, Json(body)).into_response()
    }
}

/// Stable error shape shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ApiErrorBody {
    fn new(detail: &str) -> Self {
        Self {
            detail: detail.to_string(),
            errors: None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidEmail(e) => {
                ApiError::Validation(FieldErrors::single("email", e.to_string()))
            }
            IdentityError::InvalidFullName(e) => {
                ApiError::Validation(FieldErrors::single("full_name", e.to_string()))
            }
            IdentityError::Validation(errors) => ApiError::Validation(errors),
            IdentityError::InvalidRole(_) => {
                ApiError::Forbidden("User role is not valid for this operation.".to_string())
            }
            IdentityError::NotFound(_) => ApiError::NotFound("User not found.".to_string()),
            IdentityError::EmailAlreadyExists(_) => {
                ApiError::Conflict("A user with this email already exists.".to_string())
            }
            IdentityError::InvalidCredentials => ApiError::Unauthorized(
                "Unable to log in with provided credentials.".to_string(),
            ),
            IdentityError::InvalidUserId(_) | IdentityError::InvalidToken => {
                ApiError::BadRequest(INVALID_TOKEN.to_string())
            }
            IdentityError::Password(_)
            | IdentityError::Token(_)
            | IdentityError::DatabaseError(_)
            | IdentityError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::InvalidRole(ref reason) => {
                tracing::warn!("Rejected profile access: {}", reason);
                ApiError::Forbidden("User role is not valid for this operation.".to_string())
            }
            ProfileError::IncompleteProfile => ApiError::BadRequest(
                "Profile is incomplete. Complete your profile first.".to_string(),
            ),
            ProfileError::EmptyPayload => {
                ApiError::BadRequest("No fields provided for update.".to_string())
            }
            ProfileError::Validation(errors) => ApiError::Validation(errors),
            ProfileError::AlreadyExists => {
                ApiError::Conflict("Profile already exists.".to_string())
            }
            ProfileError::NotFound(_) => ApiError::NotFound("User not found.".to_string()),
            ProfileError::DatabaseError(_) | ProfileError::Unknown(_) => {
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<PasswordLifecycleError> for ApiError {
    fn from(err: PasswordLifecycleError) -> Self {
        match err {
            PasswordLifecycleError::InvalidToken => ApiError::BadRequest(INVALID_TOKEN.to_string()),
            PasswordLifecycleError::Validation(errors) => ApiError::Validation(errors),
            PasswordLifecycleError::Password(_)
            | PasswordLifecycleError::DatabaseError(_)
            | PasswordLifecycleError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

/// Collects "This field is required." errors for absent request fields.
pub(crate) fn required(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
) -> Option<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Some(value),
        Some(_) => {
            errors.add(field, "This field may not be blank.");
            None
        }
        None => {
            errors.add(field, "This field is required.");
            None
        }
    }
}
