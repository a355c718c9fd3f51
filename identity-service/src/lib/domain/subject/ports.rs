use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::subject::errors::AuthError;
use crate::subject::models::AuthorizedSubject;
use crate::subject::models::EmailAddress;
use crate::subject::models::JoinCommand;
use crate::subject::models::LoginCommand;
use crate::subject::models::LogoutOutcome;
use crate::subject::models::Role;
use crate::subject::models::Session;
use crate::subject::models::SessionId;
use crate::subject::models::Subject;
use crate::subject::models::SubjectId;
use crate::subject::models::SubjectProfile;
use crate::subject::models::Username;

/// Port for authentication domain service operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new subject and open its first session.
    ///
    /// # Arguments
    /// * `command` - Validated join command
    ///
    /// # Returns
    /// Authorization envelope for the new subject
    ///
    /// # Errors
    /// * `Conflict` - Email or username already registered in the role partition
    /// * `Validation` - Role policy requirements not met
    /// * `Internal` - Hashing, signing or store failure
    async fn join(&self, command: JoinCommand) -> Result<AuthorizedSubject, AuthError>;

    /// Authenticate with an identifier and password.
    ///
    /// # Errors
    /// * `Unauthorized` - Unknown identifier, deleted subject or wrong password (indistinguishable)
    /// * `Forbidden` - Credentials valid but subject suspended (per role policy)
    /// * `Internal` - Signing or store failure
    async fn login(&self, command: LoginCommand) -> Result<AuthorizedSubject, AuthError>;

    /// Exchange a refresh token for a brand-new token pair.
    ///
    /// # Errors
    /// * `Unauthorized` - Token invalid, expired, of the wrong role or type, revoked, or subject gone
    /// * `Forbidden` - Subject suspended (per role policy)
    /// * `Internal` - Signing or store failure
    async fn refresh(&self, role: Role, refresh_token: &str)
        -> Result<AuthorizedSubject, AuthError>;

    /// Revoke the session bound to a refresh token.
    ///
    /// # Errors
    /// * `Forbidden` - Role has stateless sessions
    /// * `Unauthorized` - Token invalid or no matching session
    /// * `Internal` - Store failure
    async fn logout(&self, role: Role, refresh_token: &str) -> Result<LogoutOutcome, AuthError>;

    /// Profile of the subject an access token was issued to.
    ///
    /// # Errors
    /// * `NotFound` - Subject no longer exists or is deleted
    /// * `Internal` - Store failure
    async fn current_subject(&self, id: &SubjectId) -> Result<SubjectProfile, AuthError>;
}

/// Persistence operations for the subject aggregate.
///
/// Lookups by email or username only consider non-deleted subjects.
#[async_trait]
pub trait SubjectRepository: Send + Sync + 'static {
    /// Persist a new subject, together with its first session if given.
    ///
    /// Both writes succeed or neither does.
    ///
    /// # Errors
    /// * `Conflict` - Email or username already taken in the role partition
    /// * `Internal` - Store failure
    async fn create(
        &self,
        subject: Subject,
        initial_session: Option<Session>,
    ) -> Result<Subject, AuthError>;

    /// # Errors
    /// * `Internal` - Store failure
    async fn find_by_id(&self, id: &SubjectId) -> Result<Option<Subject>, AuthError>;

    /// # Errors
    /// * `Internal` - Store failure
    async fn find_by_email(
        &self,
        role: Role,
        email: &EmailAddress,
    ) -> Result<Option<Subject>, AuthError>;

    /// # Errors
    /// * `Internal` - Store failure
    async fn find_by_username(
        &self,
        role: Role,
        username: &Username,
    ) -> Result<Option<Subject>, AuthError>;

    /// Bump `updated_at` of a live subject, leaving every other column as stored.
    ///
    /// # Returns
    /// The stored subject after the write, `None` if it is missing or deleted
    ///
    /// # Errors
    /// * `Internal` - Store failure
    async fn touch(&self, id: &SubjectId, at: DateTime<Utc>) -> Result<Option<Subject>, AuthError>;

    /// Overwrite a stored subject.
    ///
    /// # Errors
    /// * `NotFound` - Subject does not exist
    /// * `Conflict` - New email or username already taken
    /// * `Internal` - Store failure
    async fn update(&self, subject: Subject) -> Result<Subject, AuthError>;
}

/// Persistence operations for refresh-token sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// # Errors
    /// * `Internal` - Store failure
    async fn create(&self, session: Session) -> Result<Session, AuthError>;

    /// Look up a session by the digest of its refresh token.
    ///
    /// # Errors
    /// * `Internal` - Store failure
    async fn find_by_digest(&self, token_digest: &str) -> Result<Option<Session>, AuthError>;

    /// Revoke `previous` and record `next` in one write.
    ///
    /// # Errors
    /// * `Unauthorized` - `previous` is missing or already revoked; nothing is written
    /// * `Internal` - Store failure; nothing is written
    async fn rotate(
        &self,
        previous: &SessionId,
        next: Session,
        at: DateTime<Utc>,
    ) -> Result<Session, AuthError>;

    /// Mark a session revoked. An already revoked session keeps its original timestamp.
    ///
    /// # Errors
    /// * `NotFound` - Session does not exist
    /// * `Internal` - Store failure
    async fn revoke(&self, id: &SessionId, at: DateTime<Utc>) -> Result<(), AuthError>;
}

/// One-way password hashing boundary.
#[async_trait]
pub trait PasswordHashing: Send + Sync + 'static {
    /// Hash a plaintext password with a fresh salt.
    ///
    /// # Errors
    /// * `Internal` - Hashing failed
    async fn hash(&self, plaintext: &str) -> Result<String, AuthError>;

    /// True only for the plaintext that produced `hash`; malformed hashes never match.
    async fn verify(&self, plaintext: &str, hash: &str) -> bool;
}
