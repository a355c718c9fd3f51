use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::session::insert_session;
use crate::domain::subject::models::EmailAddress;
use crate::domain::subject::models::Role;
use crate::domain::subject::models::Session;
use crate::domain::subject::models::Subject;
use crate::domain::subject::models::SubjectId;
use crate::domain::subject::models::Username;
use crate::domain::subject::ports::SubjectRepository;
use crate::subject::errors::AuthError;
use crate::subject::errors::ConflictField;

const SUBJECT_COLUMNS: &str = "id, role, email, username, display_name, password_hash, \
     email_verified, created_at, updated_at, deleted_at, suspended_at";

pub struct PostgresSubjectRepository {
    pool: PgPool,
}

impl PostgresSubjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        predicate: &str,
        role: Role,
        value: &str,
    ) -> Result<Option<Subject>, AuthError> {
        let query = format!(
            "SELECT {} FROM subjects WHERE role = $1 AND {} = $2 AND deleted_at IS NULL",
            SUBJECT_COLUMNS, predicate
        );

        sqlx::query_as::<_, SubjectRow>(&query)
            .bind(role.as_str())
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?
            .map(Subject::try_from)
            .transpose()
    }
}

#[derive(sqlx::FromRow)]
struct SubjectRow {
    id: Uuid,
    role: String,
    email: Option<String>,
    username: Option<String>,
    display_name: Option<String>,
    password_hash: Option<String>,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    suspended_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubjectRow> for Subject {
    type Error = AuthError;

    fn try_from(r: SubjectRow) -> Result<Self, Self::Error> {
        let id = r.id;
        let corrupt = move |e: String| AuthError::Internal(format!("Corrupt subject row {}: {}", id, e));

        Ok(Subject {
            id: SubjectId(r.id),
            role: Role::from_str(&r.role).map_err(|e| corrupt(e.to_string()))?,
            email: r
                .email
                .map(EmailAddress::new)
                .transpose()
                .map_err(|e| corrupt(e.to_string()))?,
            username: r
                .username
                .map(Username::new)
                .transpose()
                .map_err(|e| corrupt(e.to_string()))?,
            display_name: r.display_name,
            password_hash: r.password_hash,
            email_verified: r.email_verified,
            created_at: r.created_at,
            updated_at: r.updated_at,
            deleted_at: r.deleted_at,
            suspended_at: r.suspended_at,
        })
    }
}

/// Translate unique index violations into the conflicting identifier.
fn map_write_error(e: sqlx::Error) -> AuthError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            if db_err.constraint() == Some("subjects_role_email_key") {
                return AuthError::Conflict(ConflictField::Email);
            }
            if db_err.constraint() == Some("subjects_role_username_key") {
                return AuthError::Conflict(ConflictField::Username);
            }
        }
    }
    AuthError::Internal(format!("Database error: {}", e))
}

#[async_trait]
impl SubjectRepository for PostgresSubjectRepository {
    async fn create(
        &self,
        subject: Subject,
        initial_session: Option<Session>,
    ) -> Result<Subject, AuthError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO subjects (id, role, email, username, display_name, password_hash,
                                  email_verified, created_at, updated_at, deleted_at, suspended_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(subject.id.0)
        .bind(subject.role.as_str())
        .bind(subject.email.as_ref().map(|e| e.as_str()))
        .bind(subject.username.as_ref().map(|u| u.as_str()))
        .bind(subject.display_name.as_deref())
        .bind(subject.password_hash.as_deref())
        .bind(subject.email_verified)
        .bind(subject.created_at)
        .bind(subject.updated_at)
        .bind(subject.deleted_at)
        .bind(subject.suspended_at)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if let Some(session) = &initial_session {
            insert_session(&mut *tx, session).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?;

        Ok(subject)
    }

    async fn find_by_id(&self, id: &SubjectId) -> Result<Option<Subject>, AuthError> {
        let query = format!("SELECT {} FROM subjects WHERE id = $1", SUBJECT_COLUMNS);

        sqlx::query_as::<_, SubjectRow>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?
            .map(Subject::try_from)
            .transpose()
    }

    async fn find_by_email(
        &self,
        role: Role,
        email: &EmailAddress,
    ) -> Result<Option<Subject>, AuthError> {
        self.fetch_one_where("email", role, email.as_str()).await
    }

    async fn find_by_username(
        &self,
        role: Role,
        username: &Username,
    ) -> Result<Option<Subject>, AuthError> {
        self.fetch_one_where("username", role, username.as_str())
            .await
    }

    async fn touch(&self, id: &SubjectId, at: DateTime<Utc>) -> Result<Option<Subject>, AuthError> {
        let query = format!(
            "UPDATE subjects SET updated_at = $2 WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            SUBJECT_COLUMNS
        );

        sqlx::query_as::<_, SubjectRow>(&query)
            .bind(id.0)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?
            .map(Subject::try_from)
            .transpose()
    }

    async fn update(&self, subject: Subject) -> Result<Subject, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE subjects
            SET email = $2, username = $3, display_name = $4, password_hash = $5,
                email_verified = $6, updated_at = $7, deleted_at = $8, suspended_at = $9
            WHERE id = $1
            "#,
        )
        .bind(subject.id.0)
        .bind(subject.email.as_ref().map(|e| e.as_str()))
        .bind(subject.username.as_ref().map(|u| u.as_str()))
        .bind(subject.display_name.as_deref())
        .bind(subject.password_hash.as_deref())
        .bind(subject.email_verified)
        .bind(subject.updated_at)
        .bind(subject.deleted_at)
        .bind(subject.suspended_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(format!(
                "Subject not found: {}",
                subject.id
            )));
        }

        Ok(subject)
    }
}
