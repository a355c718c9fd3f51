use std::fmt;
use std::str::FromStr;

use auth::TokenPair;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::subject::errors::EmailError;
use crate::subject::errors::PasswordPolicyError;
use crate::subject::errors::RoleError;
use crate::subject::errors::SubjectIdError;
use crate::subject::errors::UsernameError;

/// Subject aggregate entity.
///
/// A registered principal of one role partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: SubjectId,
    pub role: Role,
    pub email: Option<EmailAddress>,
    pub username: Option<Username>,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub suspended_at: Option<DateTime<Utc>>,
}

impl Subject {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }
}

/// Subject unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubjectId(pub Uuid);

impl SubjectId {
    /// Generate a new random subject ID.
    ///
    /// # Returns
    /// SubjectId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a subject ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, SubjectIdError> {
        Uuid::parse_str(s)
            .map(SubjectId)
            .map_err(|e| SubjectIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role partition of a subject. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
    Moderator,
    Seller,
    Customer,
    Guest,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Member,
        Role::Admin,
        Role::Moderator,
        Role::Seller,
        Role::Customer,
        Role::Guest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Seller => "seller",
            Role::Customer => "customer",
            Role::Guest => "guest",
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| RoleError::Unknown(s.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username value type
///
/// Ensures username is 3-32 characters and contains only alphanumeric, underscore, and hyphen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 32;

    /// Create a new valid username.
    ///
    /// # Errors
    /// * `TooShort` - Username shorter than 3 characters
    /// * `TooLong` - Username longer than 32 characters
    /// * `InvalidCharacters` - Contains non-alphanumeric characters (except _ and -)
    pub fn new(username: String) -> Result<Self, UsernameError> {
        let username = Self::with_valid_length(username)?;
        let username = Self::with_valid_chars(username)?;
        Ok(Self(username))
    }

    fn with_valid_length(username: String) -> Result<String, UsernameError> {
        let length = username.chars().count();
        if length < Self::MIN_LENGTH {
            Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(username)
        }
    }

    fn with_valid_chars(username: String) -> Result<String, UsernameError> {
        if username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            Ok(username)
        } else {
            Err(UsernameError::InvalidCharacters)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validated with an RFC 5322 parser and stored trimmed and lower-cased, so
/// lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated, normalized email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let normalized = email.trim().to_lowercase();

        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Plaintext password accepted at registration.
///
/// Never printed: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    const MIN_LENGTH: usize = 8;
    const MAX_LENGTH: usize = 128;

    /// # Errors
    /// * `TooShort` - Fewer than 8 characters
    /// * `TooLong` - More than 128 characters
    pub fn new(password: String) -> Result<Self, PasswordPolicyError> {
        let length = password.chars().count();
        if length < Self::MIN_LENGTH {
            Err(PasswordPolicyError::TooShort {
                min: Self::MIN_LENGTH,
            })
        } else if length > Self::MAX_LENGTH {
            Err(PasswordPolicyError::TooLong {
                max: Self::MAX_LENGTH,
            })
        } else {
            Ok(Self(password))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Session record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Server-side record of an issued refresh token.
///
/// Only the token digest is kept, never the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub subject_id: SubjectId,
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a session. `Revoked` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Revoked,
    Expired,
}

impl Session {
    /// Open a session bound to the refresh token of `tokens`.
    pub fn open(subject_id: SubjectId, tokens: &TokenPair, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            subject_id,
            token_digest: auth::token_digest(&tokens.refresh),
            expires_at: tokens.refreshable_until,
            created_at: now,
            revoked_at: None,
        }
    }

    /// Revocation wins over expiry.
    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if self.revoked_at.is_some() {
            SessionState::Revoked
        } else if self.expires_at <= now {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }
}

/// Command to register a new subject with domain types
#[derive(Debug)]
pub struct JoinCommand {
    pub role: Role,
    pub email: Option<EmailAddress>,
    pub username: Option<Username>,
    pub password: Option<Password>,
    pub display_name: Option<String>,
}

/// Command to log in with an identifier and a plaintext password.
///
/// The identifier stays raw: it is interpreted per role policy, and a
/// malformed identifier is answered like an unknown one.
pub struct LoginCommand {
    pub role: Role,
    pub identifier: String,
    pub password: String,
}

impl fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCommand")
            .field("role", &self.role)
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Public, non-sensitive view of a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectProfile {
    pub id: SubjectId,
    pub role: Role,
    pub email: Option<EmailAddress>,
    pub username: Option<Username>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Subject> for SubjectProfile {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id,
            role: subject.role,
            email: subject.email.clone(),
            username: subject.username.clone(),
            display_name: subject.display_name.clone(),
            email_verified: subject.email_verified,
            created_at: subject.created_at,
            updated_at: subject.updated_at,
        }
    }
}

/// Authorization envelope: subject profile plus a token pair.
///
/// Returned identically by join, login and refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedSubject {
    pub subject: SubjectProfile,
    pub token: TokenPair,
}

impl AuthorizedSubject {
    pub fn build(subject: &Subject, token: TokenPair) -> Self {
        Self {
            subject: subject.into(),
            token,
        }
    }
}

/// Confirmation returned by logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub success: bool,
    pub message: String,
}

impl LogoutOutcome {
    pub fn revoked() -> Self {
        Self {
            success: true,
            message: "Session revoked".to_string(),
        }
    }

    pub fn already_revoked() -> Self {
        Self {
            success: true,
            message: "Session already revoked".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            "superuser".parse::<Role>(),
            Err(RoleError::Unknown("superuser".to_string()))
        );
    }

    #[test]
    fn test_email_is_normalized() {
        let email = EmailAddress::new("  Alice@Example.COM ".to_string()).unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn test_email_rejects_malformed() {
        assert!(EmailAddress::new("not-an-email".to_string()).is_err());
    }

    #[test]
    fn test_username_validation() {
        assert!(Username::new("nicola_99".to_string()).is_ok());
        assert_eq!(
            Username::new("ab".to_string()),
            Err(UsernameError::TooShort { min: 3, actual: 2 })
        );
        assert_eq!(
            Username::new("bad name".to_string()),
            Err(UsernameError::InvalidCharacters)
        );
    }

    #[test]
    fn test_password_policy_and_redaction() {
        let password = Password::new("Secret123!".to_string()).unwrap();
        assert_eq!(password.expose(), "Secret123!");
        assert_eq!(format!("{:?}", password), "Password(***)");

        assert_eq!(
            Password::new("short".to_string()),
            Err(PasswordPolicyError::TooShort { min: 8 })
        );
    }

    #[test]
    fn test_session_state_transitions() {
        let now = Utc::now();
        let mut session = Session {
            id: SessionId::new(),
            subject_id: SubjectId::new(),
            token_digest: "digest".to_string(),
            expires_at: now + Duration::days(7),
            created_at: now,
            revoked_at: None,
        };

        assert_eq!(session.state(now), SessionState::Active);
        assert_eq!(session.state(now + Duration::days(8)), SessionState::Expired);

        session.revoked_at = Some(now);
        assert_eq!(session.state(now), SessionState::Revoked);
        assert_eq!(session.state(now + Duration::days(8)), SessionState::Revoked);
    }

    #[test]
    fn test_envelope_excludes_password_hash() {
        let now = Utc::now();
        let subject = Subject {
            id: SubjectId::new(),
            role: Role::Member,
            email: Some(EmailAddress::new("a@x.com".to_string()).unwrap()),
            username: None,
            display_name: Some("Alice".to_string()),
            password_hash: Some("$argon2id$test_hash".to_string()),
            email_verified: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            suspended_at: None,
        };
        let token = TokenPair {
            access: "access".to_string(),
            refresh: "refresh".to_string(),
            expired_at: now,
            refreshable_until: now,
        };

        let envelope = AuthorizedSubject::build(&subject, token.clone());

        assert_eq!(envelope.subject.id, subject.id);
        assert_eq!(envelope.subject.display_name.as_deref(), Some("Alice"));
        assert_eq!(envelope.token, token);
        assert!(!format!("{:?}", envelope).contains("argon2"));
    }
}
