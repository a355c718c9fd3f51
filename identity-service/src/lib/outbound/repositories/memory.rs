use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::subject::models::EmailAddress;
use crate::domain::subject::models::Role;
use crate::domain::subject::models::Session;
use crate::domain::subject::models::SessionId;
use crate::domain::subject::models::Subject;
use crate::domain::subject::models::SubjectId;
use crate::domain::subject::models::Username;
use crate::domain::subject::ports::SessionRepository;
use crate::domain::subject::ports::SubjectRepository;
use crate::subject::errors::AuthError;
use crate::subject::errors::ConflictField;

/// Process-local store backing both repository ports.
///
/// Clones share the same maps. Writers take the subjects lock before the
/// sessions lock.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    subjects: Arc<RwLock<HashMap<SubjectId, Subject>>>,
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// First identifier of `subject` already held by another live subject of its role.
fn find_conflict(
    subjects: &HashMap<SubjectId, Subject>,
    subject: &Subject,
) -> Option<ConflictField> {
    let live_peers = subjects
        .values()
        .filter(|other| other.id != subject.id && other.role == subject.role && !other.is_deleted());

    for other in live_peers {
        if subject.email.is_some() && other.email == subject.email {
            return Some(ConflictField::Email);
        }
        if subject.username.is_some() && other.username == subject.username {
            return Some(ConflictField::Username);
        }
    }
    None
}

#[async_trait]
impl SubjectRepository for InMemoryStore {
    async fn create(
        &self,
        subject: Subject,
        initial_session: Option<Session>,
    ) -> Result<Subject, AuthError> {
        let mut subjects = self.subjects.write().await;

        if !subject.is_deleted() {
            if let Some(field) = find_conflict(&subjects, &subject) {
                return Err(AuthError::Conflict(field));
            }
        }

        if let Some(session) = initial_session {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session.id, session);
        }
        subjects.insert(subject.id, subject.clone());

        Ok(subject)
    }

    async fn find_by_id(&self, id: &SubjectId) -> Result<Option<Subject>, AuthError> {
        Ok(self.subjects.read().await.get(id).cloned())
    }

    async fn find_by_email(
        &self,
        role: Role,
        email: &EmailAddress,
    ) -> Result<Option<Subject>, AuthError> {
        Ok(self
            .subjects
            .read()
            .await
            .values()
            .find(|s| s.role == role && !s.is_deleted() && s.email.as_ref() == Some(email))
            .cloned())
    }

    async fn find_by_username(
        &self,
        role: Role,
        username: &Username,
    ) -> Result<Option<Subject>, AuthError> {
        Ok(self
            .subjects
            .read()
            .await
            .values()
            .find(|s| s.role == role && !s.is_deleted() && s.username.as_ref() == Some(username))
            .cloned())
    }

    async fn touch(&self, id: &SubjectId, at: DateTime<Utc>) -> Result<Option<Subject>, AuthError> {
        let mut subjects = self.subjects.write().await;

        Ok(subjects
            .get_mut(id)
            .filter(|subject| !subject.is_deleted())
            .map(|subject| {
                subject.updated_at = at;
                subject.clone()
            }))
    }

    async fn update(&self, subject: Subject) -> Result<Subject, AuthError> {
        let mut subjects = self.subjects.write().await;

        if !subjects.contains_key(&subject.id) {
            return Err(AuthError::NotFound(format!(
                "Subject not found: {}",
                subject.id
            )));
        }
        if !subject.is_deleted() {
            if let Some(field) = find_conflict(&subjects, &subject) {
                return Err(AuthError::Conflict(field));
            }
        }

        subjects.insert(subject.id, subject.clone());
        Ok(subject)
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn create(&self, session: Session) -> Result<Session, AuthError> {
        let mut sessions = self.sessions.write().await;

        if sessions
            .values()
            .any(|existing| existing.token_digest == session.token_digest)
        {
            return Err(AuthError::Internal(
                "Session token digest already recorded".to_string(),
            ));
        }

        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn rotate(
        &self,
        previous: &SessionId,
        next: Session,
        at: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let mut sessions = self.sessions.write().await;

        if !sessions
            .get(previous)
            .is_some_and(|session| session.revoked_at.is_none())
        {
            return Err(AuthError::Unauthorized);
        }
        if sessions
            .values()
            .any(|existing| existing.token_digest == next.token_digest)
        {
            return Err(AuthError::Internal(
                "Session token digest already recorded".to_string(),
            ));
        }

        if let Some(session) = sessions.get_mut(previous) {
            session.revoked_at = Some(at);
        }
        sessions.insert(next.id, next.clone());

        Ok(next)
    }

    async fn find_by_digest(&self, token_digest: &str) -> Result<Option<Session>, AuthError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.token_digest == token_digest)
            .cloned())
    }

    async fn revoke(&self, id: &SessionId, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut sessions = self.sessions.write().await;

        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AuthError::NotFound(format!("Session not found: {}", id)))?;
        session.revoked_at.get_or_insert(at);

        Ok(())
    }
}
