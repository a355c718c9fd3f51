use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::parse_role;
use super::ApiError;
use super::ApiSuccess;
use super::AuthorizationResponseData;
use crate::domain::subject::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

pub async fn refresh(
    State(state): State<AppState>,
    Path(role): Path<String>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<ApiSuccess<AuthorizationResponseData>, ApiError> {
    let role = parse_role(&role)?;
    let Json(body) = body?;

    state
        .auth_service
        .refresh(role, &body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|ref authorized| ApiSuccess::new(StatusCode::OK, authorized.into()))
}

/// Body shared by refresh and logout.
#[derive(Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}
