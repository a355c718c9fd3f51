use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::parse_role;
use super::ApiError;
use super::ApiSuccess;
use super::AuthorizationResponseData;
use crate::domain::subject::models::EmailAddress;
use crate::domain::subject::models::JoinCommand;
use crate::domain::subject::models::Password;
use crate::domain::subject::models::Role;
use crate::domain::subject::models::Username;
use crate::domain::subject::ports::AuthServicePort;
use crate::inbound::http::router::AppState;
use crate::subject::errors::EmailError;
use crate::subject::errors::PasswordPolicyError;
use crate::subject::errors::UsernameError;

pub async fn join(
    State(state): State<AppState>,
    Path(role): Path<String>,
    body: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<ApiSuccess<AuthorizationResponseData>, ApiError> {
    let role = parse_role(&role)?;
    let Json(body) = body?;

    state
        .auth_service
        .join(body.try_into_command(role)?)
        .await
        .map_err(ApiError::from)
        .map(|ref authorized| ApiSuccess::new(StatusCode::CREATED, authorized.into()))
}

/// HTTP request body for registering a subject (raw JSON)
///
/// Which fields are required depends on the role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Clone, Error)]
enum ParseJoinRequestError {
    #[error("Invalid username: {0}")]
    Username(#[from] UsernameError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordPolicyError),
}

impl JoinRequest {
    fn try_into_command(self, role: Role) -> Result<JoinCommand, ParseJoinRequestError> {
        let email = self.email.map(EmailAddress::new).transpose()?;
        let username = self.username.map(Username::new).transpose()?;
        let password = self.password.map(Password::new).transpose()?;
        let display_name = self
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Ok(JoinCommand {
            role,
            email,
            username,
            password,
            display_name,
        })
    }
}

impl From<ParseJoinRequestError> for ApiError {
    fn from(err: ParseJoinRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: Option<&str>, password: Option<&str>) -> JoinRequest {
        JoinRequest {
            email: email.map(str::to_string),
            username: None,
            password: password.map(str::to_string),
            display_name: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_request_normalizes_fields() {
        let command = request(Some("Bob@Example.com"), Some("Secret123!"))
            .try_into_command(Role::Customer)
            .unwrap();

        assert_eq!(command.role, Role::Customer);
        assert_eq!(command.email.unwrap().as_str(), "bob@example.com");
        assert_eq!(command.display_name, None);
    }

    #[test]
    fn test_request_rejects_short_password() {
        let err = request(Some("bob@example.com"), Some("short"))
            .try_into_command(Role::Customer)
            .unwrap_err();

        assert!(matches!(err, ParseJoinRequestError::Password(_)));
    }
}
