use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::subject::models::Session;
use crate::domain::subject::models::SessionId;
use crate::domain::subject::models::SubjectId;
use crate::domain::subject::ports::SessionRepository;
use crate::subject::errors::AuthError;

pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    subject_id: Uuid,
    token_digest: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

impl From<SessionRow> for Session {
    fn from(r: SessionRow) -> Self {
        Session {
            id: SessionId(r.id),
            subject_id: SubjectId(r.subject_id),
            token_digest: r.token_digest,
            expires_at: r.expires_at,
            created_at: r.created_at,
            revoked_at: r.revoked_at,
        }
    }
}

/// Insert a session on any executor, so subject creation can include it in its transaction.
pub(super) async fn insert_session<'e, E>(executor: E, session: &Session) -> Result<(), AuthError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO sessions (id, subject_id, token_digest, expires_at, created_at, revoked_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(session.id.0)
    .bind(session.subject_id.0)
    .bind(&session.token_digest)
    .bind(session.expires_at)
    .bind(session.created_at)
    .bind(session.revoked_at)
    .execute(executor)
    .await
    .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?;

    Ok(())
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn create(&self, session: Session) -> Result<Session, AuthError> {
        insert_session(&self.pool, &session).await?;
        Ok(session)
    }

    async fn rotate(
        &self,
        previous: &SessionId,
        next: Session,
        at: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?;

        // Row lock: a concurrent rotation of the same session matches no row here
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET revoked_at = $2
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(previous.0)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::Unauthorized);
        }

        insert_session(&mut *tx, &next).await?;

        tx.commit()
            .await
            .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?;

        Ok(next)
    }

    async fn find_by_digest(&self, token_digest: &str) -> Result<Option<Session>, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, subject_id, token_digest, expires_at, created_at, revoked_at
            FROM sessions
            WHERE token_digest = $1
            "#,
        )
        .bind(token_digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?;

        Ok(row.map(Session::from))
    }

    async fn revoke(&self, id: &SessionId, at: DateTime<Utc>) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET revoked_at = COALESCE(revoked_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Internal(format!("Database error: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(format!("Session not found: {}", id)));
        }

        Ok(())
    }
}
