use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::identity::models::VerifyEmailCommand;
use crate::inbound::http::router::AppState;

/// Target of the link in the verification mail.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<VerifyEmailParams>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    // Missing parameters fail the same way as forged ones.
    state
        .account_service
        .verify_email(VerifyEmailCommand {
            uid: params.uid.unwrap_or_default(),
            token: params.token.unwrap_or_default(),
        })
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, MessageData::new("Email verified successfully")))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyEmailParams {
    uid: Option<String>,
    token: Option<String>,
}
