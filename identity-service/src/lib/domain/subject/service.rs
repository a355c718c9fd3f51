use std::sync::Arc;

use async_trait::async_trait;
use auth::TokenIssuer;
use auth::TokenPair;
use auth::TokenType;
use chrono::DateTime;
use chrono::Utc;

use crate::subject::errors::AuthError;
use crate::subject::errors::ConflictField;
use crate::subject::models::AuthorizedSubject;
use crate::subject::models::EmailAddress;
use crate::subject::models::JoinCommand;
use crate::subject::models::LoginCommand;
use crate::subject::models::LogoutOutcome;
use crate::subject::models::Role;
use crate::subject::models::Session;
use crate::subject::models::SessionState;
use crate::subject::models::Subject;
use crate::subject::models::SubjectId;
use crate::subject::models::SubjectProfile;
use crate::subject::models::Username;
use crate::subject::policy::IdentifierField;
use crate::subject::policy::RolePolicies;
use crate::subject::policy::RolePolicy;
use crate::subject::policy::SuspensionResponse;
use crate::subject::ports::AuthServicePort;
use crate::subject::ports::PasswordHashing;
use crate::subject::ports::SessionRepository;
use crate::subject::ports::SubjectRepository;

/// Domain service implementation for authentication operations.
///
/// One instance serves every role; behavior differences come from the
/// injected `RolePolicies`.
pub struct AuthService<SR, SS, PH>
where
    SR: SubjectRepository,
    SS: SessionRepository,
    PH: PasswordHashing,
{
    subjects: Arc<SR>,
    sessions: Arc<SS>,
    passwords: Arc<PH>,
    issuer: Arc<TokenIssuer>,
    policies: RolePolicies,
}

impl<SR, SS, PH> AuthService<SR, SS, PH>
where
    SR: SubjectRepository,
    SS: SessionRepository,
    PH: PasswordHashing,
{
    /// Create a new authentication service with injected dependencies.
    ///
    /// # Arguments
    /// * `subjects` - Subject persistence implementation
    /// * `sessions` - Session persistence implementation
    /// * `passwords` - Password hashing boundary
    /// * `issuer` - Token issuer holding the signing secret
    /// * `policies` - Per-role authentication policies
    pub fn new(
        subjects: Arc<SR>,
        sessions: Arc<SS>,
        passwords: Arc<PH>,
        issuer: Arc<TokenIssuer>,
        policies: RolePolicies,
    ) -> Self {
        Self {
            subjects,
            sessions,
            passwords,
            issuer,
            policies,
        }
    }

    /// Fail if a non-deleted subject of `role` already uses an identifier.
    ///
    /// Email is checked before username.
    ///
    /// # Errors
    /// * `Conflict` - Names the colliding field, never its value
    /// * `Internal` - Store failure
    pub async fn register_check(
        &self,
        role: Role,
        email: Option<&EmailAddress>,
        username: Option<&Username>,
    ) -> Result<(), AuthError> {
        if let Some(email) = email {
            if self.subjects.find_by_email(role, email).await?.is_some() {
                return Err(AuthError::Conflict(ConflictField::Email));
            }
        }

        if let Some(username) = username {
            if self
                .subjects
                .find_by_username(role, username)
                .await?
                .is_some()
            {
                return Err(AuthError::Conflict(ConflictField::Username));
            }
        }

        Ok(())
    }

    /// Resolve the subject a login identifier and password belong to.
    ///
    /// Unknown identifiers, deleted subjects and wrong passwords all yield
    /// the same `Unauthorized`. Suspension is only reported once the
    /// password has verified.
    ///
    /// # Errors
    /// * `Unauthorized` - Credentials do not match an active subject
    /// * `Forbidden` - Subject suspended and the role answers with 403
    /// * `Internal` - Store failure
    pub async fn login_check(
        &self,
        policy: &RolePolicy,
        identifier: &str,
        password: &str,
    ) -> Result<Subject, AuthError> {
        let subject = self
            .resolve_identifier(policy, identifier)
            .await?
            .filter(|subject| !subject.is_deleted())
            .ok_or(AuthError::Unauthorized)?;

        let password_hash = subject
            .password_hash
            .as_deref()
            .ok_or(AuthError::Unauthorized)?;

        if !self.passwords.verify(password, password_hash).await {
            return Err(AuthError::Unauthorized);
        }

        Self::ensure_active(policy, &subject)?;

        Ok(subject)
    }

    async fn resolve_identifier(
        &self,
        policy: &RolePolicy,
        identifier: &str,
    ) -> Result<Option<Subject>, AuthError> {
        let as_email = || EmailAddress::new(identifier.to_string()).ok();
        let as_username = || Username::new(identifier.to_string()).ok();

        let (email, username) = match policy.identifier {
            IdentifierField::Email => (as_email(), None),
            IdentifierField::Username => (None, as_username()),
            IdentifierField::EmailOrUsername if identifier.contains('@') => (as_email(), None),
            IdentifierField::EmailOrUsername => (None, as_username()),
            IdentifierField::None => (None, None),
        };

        match (email, username) {
            (Some(email), _) => self.subjects.find_by_email(policy.role, &email).await,
            (None, Some(username)) => {
                self.subjects
                    .find_by_username(policy.role, &username)
                    .await
            }
            (None, None) => Ok(None),
        }
    }

    fn ensure_active(policy: &RolePolicy, subject: &Subject) -> Result<(), AuthError> {
        if subject.is_deleted() {
            return Err(AuthError::Unauthorized);
        }

        if subject.is_suspended() {
            return Err(match policy.suspension {
                SuspensionResponse::Forbidden => {
                    AuthError::Forbidden("Account is suspended".to_string())
                }
                SuspensionResponse::Unauthorized => AuthError::Unauthorized,
            });
        }

        Ok(())
    }

    fn issue(
        &self,
        policy: &RolePolicy,
        subject_id: &SubjectId,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        Ok(self
            .issuer
            .issue(subject_id, policy.role.as_str(), &policy.lifetimes, now)?)
    }

    /// Verify a refresh token for `role` and return the subject id it names.
    fn verify_refresh(&self, role: Role, refresh_token: &str) -> Result<SubjectId, AuthError> {
        let claims = self
            .issuer
            .verify(refresh_token, TokenType::Refresh)
            .map_err(|e| {
                tracing::debug!(role = %role, error = %e, "Refresh token rejected");
                AuthError::Unauthorized
            })?;

        if claims.role != role.as_str() {
            tracing::debug!(role = %role, token_role = %claims.role, "Refresh token role mismatch");
            return Err(AuthError::Unauthorized);
        }

        SubjectId::from_string(&claims.sub).map_err(|_| AuthError::Unauthorized)
    }

    /// Record activity and re-check the subject as stored after the write.
    ///
    /// # Errors
    /// * `Unauthorized` - Subject deleted or gone since it was read
    /// * `Forbidden` - Subject suspended since it was read (per role policy)
    async fn touch(
        &self,
        policy: &RolePolicy,
        id: &SubjectId,
        now: DateTime<Utc>,
    ) -> Result<Subject, AuthError> {
        let subject = self
            .subjects
            .touch(id, now)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        Self::ensure_active(policy, &subject)?;

        Ok(subject)
    }
}

#[async_trait]
impl<SR, SS, PH> AuthServicePort for AuthService<SR, SS, PH>
where
    SR: SubjectRepository,
    SS: SessionRepository,
    PH: PasswordHashing,
{
    async fn join(&self, command: JoinCommand) -> Result<AuthorizedSubject, AuthError> {
        let policy = self.policies.get(command.role);
        policy.validate_join(&command)?;

        self.register_check(
            command.role,
            command.email.as_ref(),
            command.username.as_ref(),
        )
        .await?;

        let password_hash = match &command.password {
            Some(password) => Some(self.passwords.hash(password.expose()).await?),
            None => None,
        };

        let now = Utc::now();
        let subject = Subject {
            id: SubjectId::new(),
            role: command.role,
            email: command.email,
            username: command.username,
            display_name: command.display_name,
            password_hash,
            email_verified: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            suspended_at: None,
        };

        let tokens = self.issue(policy, &subject.id, now)?;
        let session = policy
            .is_revocable()
            .then(|| Session::open(subject.id, &tokens, now));

        let subject = self.subjects.create(subject, session).await?;

        tracing::info!(
            role = %subject.role,
            subject_id = %subject.id,
            "Subject registered"
        );

        Ok(AuthorizedSubject::build(&subject, tokens))
    }

    async fn login(&self, command: LoginCommand) -> Result<AuthorizedSubject, AuthError> {
        let policy = self.policies.get(command.role);

        let subject = self
            .login_check(policy, &command.identifier, &command.password)
            .await
            .inspect_err(|e| {
                tracing::info!(role = %command.role, error = %e, "Login rejected");
            })?;

        let now = Utc::now();
        let subject = self.touch(policy, &subject.id, now).await?;
        let tokens = self.issue(policy, &subject.id, now)?;

        if policy.is_revocable() {
            self.sessions
                .create(Session::open(subject.id, &tokens, now))
                .await?;
        }

        tracing::info!(
            role = %subject.role,
            subject_id = %subject.id,
            "Subject logged in"
        );

        Ok(AuthorizedSubject::build(&subject, tokens))
    }

    async fn refresh(
        &self,
        role: Role,
        refresh_token: &str,
    ) -> Result<AuthorizedSubject, AuthError> {
        let policy = self.policies.get(role);
        let subject_id = self.verify_refresh(role, refresh_token)?;

        let subject = self
            .subjects
            .find_by_id(&subject_id)
            .await?
            .filter(|subject| subject.role == role)
            .ok_or(AuthError::Unauthorized)?;

        Self::ensure_active(policy, &subject)?;

        let now = Utc::now();

        let previous_session = if policy.is_revocable() {
            let session = self
                .sessions
                .find_by_digest(&auth::token_digest(refresh_token))
                .await?
                .filter(|session| session.subject_id == subject.id)
                .ok_or(AuthError::Unauthorized)?;

            if session.state(now) != SessionState::Active {
                tracing::warn!(
                    role = %role,
                    subject_id = %subject.id,
                    session_id = %session.id,
                    "Refresh attempted on inactive session"
                );
                return Err(AuthError::Unauthorized);
            }

            Some(session)
        } else {
            None
        };

        let subject = self.touch(policy, &subject.id, now).await?;
        let tokens = self.issue(policy, &subject.id, now)?;

        if let Some(previous) = previous_session {
            self.sessions
                .rotate(&previous.id, Session::open(subject.id, &tokens, now), now)
                .await?;
        }

        tracing::info!(
            role = %subject.role,
            subject_id = %subject.id,
            "Token pair refreshed"
        );

        Ok(AuthorizedSubject::build(&subject, tokens))
    }

    async fn logout(&self, role: Role, refresh_token: &str) -> Result<LogoutOutcome, AuthError> {
        let policy = self.policies.get(role);

        if !policy.is_revocable() {
            return Err(AuthError::Forbidden(format!(
                "Logout is not available for role {}",
                role
            )));
        }

        let subject_id = self.verify_refresh(role, refresh_token)?;

        let session = self
            .sessions
            .find_by_digest(&auth::token_digest(refresh_token))
            .await?
            .filter(|session| session.subject_id == subject_id)
            .ok_or(AuthError::Unauthorized)?;

        if session.revoked_at.is_some() {
            return Ok(LogoutOutcome::already_revoked());
        }

        self.sessions.revoke(&session.id, Utc::now()).await?;

        tracing::info!(
            role = %role,
            subject_id = %subject_id,
            session_id = %session.id,
            "Session revoked"
        );

        Ok(LogoutOutcome::revoked())
    }

    async fn current_subject(&self, id: &SubjectId) -> Result<SubjectProfile, AuthError> {
        self.subjects
            .find_by_id(id)
            .await?
            .filter(|subject| !subject.is_deleted())
            .map(|subject| SubjectProfile::from(&subject))
            .ok_or_else(|| AuthError::NotFound(format!("Subject not found: {}", id)))
    }
}
