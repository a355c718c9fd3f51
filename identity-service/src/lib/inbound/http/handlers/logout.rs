use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::parse_role;
use super::refresh::RefreshRequest;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::subject::models::LogoutOutcome;
use crate::domain::subject::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    Path(role): Path<String>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<ApiSuccess<LogoutResponseData>, ApiError> {
    let role = parse_role(&role)?;
    let Json(body) = body?;

    state
        .auth_service
        .logout(role, &body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|ref outcome| ApiSuccess::new(StatusCode::OK, outcome.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutResponseData {
    pub success: bool,
    pub message: String,
}

impl From<&LogoutOutcome> for LogoutResponseData {
    fn from(outcome: &LogoutOutcome) -> Self {
        Self {
            success: outcome.success,
            message: outcome.message.clone(),
        }
    }
}
