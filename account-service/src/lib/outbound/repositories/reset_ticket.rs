use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::identity::models::UserId;
use crate::password::errors::PasswordLifecycleError;
use crate::password::models::ResetTicket;
use crate::password::models::TicketId;
use crate::password::ports::ResetTicketRepository;

#[derive(Debug, sqlx::FromRow)]
struct ResetTicketRow {
    id: Uuid,
    user_id: Uuid,
    secret_hash: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl From<ResetTicketRow> for ResetTicket {
    fn from(row: ResetTicketRow) -> Self {
        ResetTicket {
            id: TicketId(row.id),
            user_id: UserId(row.user_id),
            secret_hash: row.secret_hash,
            created_at: row.created_at,
            expires_at: row.expires_at,
            consumed_at: row.consumed_at,
        }
    }
}

fn database_error(e: sqlx::Error) -> PasswordLifecycleError {
    PasswordLifecycleError::DatabaseError(e.to_string())
}

pub struct PostgresResetTicketRepository {
    pool: PgPool,
}

impl PostgresResetTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove tickets that can no longer be redeemed. Such tickets are already
    /// rejected by [`ResetTicketRepository::redeem`]; this only reclaims space.
    pub async fn purge_expired(&self) -> Result<u64, PasswordLifecycleError> {
        let result = sqlx::query(
            "DELETE FROM password_reset_tickets WHERE consumed_at IS NOT NULL OR expires_at <= NOW()",
        )
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ResetTicketRepository for PostgresResetTicketRepository {
    async fn create(&self, ticket: ResetTicket) -> Result<ResetTicket, PasswordLifecycleError> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tickets (id, user_id, secret_hash, created_at, expires_at, consumed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(ticket.id.0)
        .bind(ticket.user_id.0)
        .bind(&ticket.secret_hash)
        .bind(ticket.created_at)
        .bind(ticket.expires_at)
        .bind(ticket.consumed_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(ticket)
    }

    async fn find(&self, id: &TicketId) -> Result<Option<ResetTicket>, PasswordLifecycleError> {
        let row = sqlx::query_as::<_, ResetTicketRow>(
            r#"
            SELECT id, user_id, secret_hash, created_at, expires_at, consumed_at
            FROM password_reset_tickets
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(ResetTicket::from))
    }

    async fn redeem(
        &self,
        id: &TicketId,
        user_id: &UserId,
        password_hash: &str,
    ) -> Result<bool, PasswordLifecycleError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        // The conditional update is the single point where a ticket flips to
        // consumed; a concurrent confirm sees zero rows here.
        let consumed = sqlx::query(
            r#"
            UPDATE password_reset_tickets
            SET consumed_at = NOW()
            WHERE id = $1 AND user_id = $2 AND consumed_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(id.0)
        .bind(user_id.0)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        if consumed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id.0)
            .bind(password_hash)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        sqlx::query(
            r#"
            UPDATE password_reset_tickets
            SET consumed_at = NOW()
            WHERE user_id = $1 AND consumed_at IS NULL
            "#,
        )
        .bind(user_id.0)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        let revoked = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id.0)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;

        tracing::debug!(
            user_id = %user_id,
            revoked_sessions = revoked.rows_affected(),
            "Reset ticket redeemed"
        );

        Ok(true)
    }
}
