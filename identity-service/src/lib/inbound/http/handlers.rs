use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::subject::errors::AuthError;
use crate::subject::models::AuthorizedSubject;
use crate::subject::models::Role;
use crate::subject::models::SubjectProfile;

pub mod health;
pub mod join;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

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
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
            ApiError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable_entity",
                msg,
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();

        (status, Json(ApiResponseBody::new_error(status, kind, message))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Conflict(_) => ApiError::Conflict(err.to_string()),
            AuthError::Unauthorized => ApiError::Unauthorized(err.to_string()),
            AuthError::Forbidden(msg) => ApiError::Forbidden(msg),
            AuthError::NotFound(msg) => ApiError::NotFound(msg),
            AuthError::Validation(msg) => ApiError::UnprocessableEntity(msg),
            AuthError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed with internal error");
                ApiError::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

/// Well-formed JSON of the wrong shape is unprocessable; anything else is a bad request.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) => {
                ApiError::UnprocessableEntity(rejection.body_text())
            }
            _ => ApiError::BadRequest(rejection.body_text()),
        }
    }
}

/// Resolve the role path segment; unknown roles are not routes.
pub(crate) fn parse_role(role: &str) -> Result<Role, ApiError> {
    Role::from_str(role).map_err(|_| ApiError::NotFound(format!("Unknown role: {}", role)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, kind: &'static str, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData {
                kind: kind.to_string(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub kind: String,
    pub message: String,
}

/// Public subject fields as rendered in every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectData {
    pub id: String,
    pub role: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SubjectProfile> for SubjectData {
    fn from(profile: &SubjectProfile) -> Self {
        Self {
            id: profile.id.to_string(),
            role: profile.role.to_string(),
            email: profile.email.as_ref().map(|e| e.as_str().to_string()),
            username: profile.username.as_ref().map(|u| u.as_str().to_string()),
            display_name: profile.display_name.clone(),
            email_verified: profile.email_verified,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    pub access: String,
    pub refresh: String,
    pub expired_at: DateTime<Utc>,
    pub refreshable_until: DateTime<Utc>,
}

/// Envelope returned by join, login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationResponseData {
    pub subject: SubjectData,
    pub token: TokenData,
}

impl From<&AuthorizedSubject> for AuthorizationResponseData {
    fn from(authorized: &AuthorizedSubject) -> Self {
        Self {
            subject: SubjectData::from(&authorized.subject),
            token: TokenData {
                access: authorized.token.access.clone(),
                refresh: authorized.token.refresh.clone(),
                expired_at: authorized.token.expired_at,
                refreshable_until: authorized.token.refreshable_until,
            },
        }
    }
}
