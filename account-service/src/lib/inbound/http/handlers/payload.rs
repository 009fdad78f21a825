use async_trait::async_trait;
use axum::extract::FromRequest;
use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use axum::Form;
use axum::Json;
use serde_json::Map;
use serde_json::Value;

use super::ApiError;

/// Raw profile body as a JSON object.
///
/// Accepts `application/json` objects and urlencoded forms. Form values all
/// arrive as strings; typed fields coerce them later.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePayload(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for ProfilePayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state).await?;
            let payload = pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            return Ok(ProfilePayload(payload));
        }

        let Json(body) = Json::<Value>::from_request(req, state).await?;
        match body {
            Value::Object(payload) => Ok(ProfilePayload(payload)),
            _ => Err(ApiError::BadRequest(
                "Invalid data. Expected a dictionary.".to_string(),
            )),
        }
    }
}
