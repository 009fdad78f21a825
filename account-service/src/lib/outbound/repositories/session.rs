use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::identity::errors::IdentityError;
use crate::identity::models::Session;
use crate::identity::models::SessionId;
use crate::identity::models::UserId;
use crate::identity::ports::SessionStore;

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: SessionId(row.id),
            user_id: UserId(row.user_id),
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove expired rows. Expired sessions are already invisible to
    /// [`SessionStore::load`]; this only reclaims space.
    pub async fn purge_expired(&self) -> Result<u64, IdentityError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, session: Session) -> Result<Session, IdentityError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session.id.0)
        .bind(session.user_id.0)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        Ok(session)
    }

    async fn load(&self, id: &SessionId) -> Result<Option<Session>, IdentityError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, created_at, expires_at
            FROM sessions
            WHERE id = $1 AND expires_at > NOW()
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        Ok(row.map(Session::from))
    }

    async fn delete(&self, id: &SessionId) -> Result<(), IdentityError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn delete_for_user(
        &self,
        user_id: &UserId,
        keep: Option<SessionId>,
    ) -> Result<u64, IdentityError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE user_id = $1 AND ($2::uuid IS NULL OR id <> $2)
            "#,
        )
        .bind(user_id.0)
        .bind(keep.map(|id| id.0))
        .execute(&self.pool)
        .await
        .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
