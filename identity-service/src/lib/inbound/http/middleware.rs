use std::str::FromStr;

use auth::TokenType;
use axum::extract::Request;
use axum::extract::State;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::subject::models::Role;
use crate::domain::subject::models::SubjectId;
use crate::inbound::http::router::AppState;

/// Extension type to store the authenticated subject in request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedSubject {
    pub subject_id: SubjectId,
    pub role: Role,
}

/// Middleware that validates access tokens and adds subject info to request extensions
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_token_from_header(&req)?;

    // Refresh tokens are rejected here
    let claims = state
        .issuer
        .verify(token, TokenType::Access)
        .map_err(|e| {
            tracing::warn!("Access token validation failed: {}", e);
            unauthorized("Invalid or expired token")
        })?;

    let subject_id = SubjectId::from_string(&claims.sub).map_err(|e| {
        tracing::error!("Failed to parse subject ID from token: {}", e);
        unauthorized("Invalid token format")
    })?;

    let role = Role::from_str(&claims.role).map_err(|e| {
        tracing::error!("Failed to parse role from token: {}", e);
        unauthorized("Invalid token format")
    })?;

    req.extensions_mut()
        .insert(AuthenticatedSubject { subject_id, role });

    Ok(next.run(req).await)
}

fn unauthorized(message: &str) -> Response {
    ApiError::Unauthorized(message.to_string()).into_response()
}

fn extract_token_from_header(req: &Request) -> Result<&str, Response> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header"))?;

    auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        unauthorized("Invalid Authorization header format. Expected: Bearer <token>")
    })
}
