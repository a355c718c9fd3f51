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
use crate::domain::subject::models::LoginCommand;
use crate::domain::subject::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    Path(role): Path<String>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiSuccess<AuthorizationResponseData>, ApiError> {
    let role = parse_role(&role)?;
    let Json(body) = body?;
    let command = LoginCommand {
        role,
        identifier: body.identifier,
        password: body.password,
    };

    state
        .auth_service
        .login(command)
        .await
        .map_err(ApiError::from)
        .map(|ref authorized| ApiSuccess::new(StatusCode::OK, authorized.into()))
}

/// HTTP request body for logging in (raw JSON)
///
/// `identifier` is an email or a username depending on the role.
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    identifier: String,
    password: String,
}
