use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::identity::errors::IdentityError;
use crate::identity::models::EmailAddress;
use crate::identity::models::FullName;
use crate::identity::models::Identity;
use crate::identity::models::RoleFlags;
use crate::identity::models::UserId;
use crate::identity::ports::IdentityRepository;

pub(crate) const IDENTITY_COLUMNS: &str =
    "id, email, full_name, phone, password_hash, is_doctor, is_patient, is_email_verified, created_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct IdentityRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub is_doctor: bool,
    pub is_patient: bool,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = IdentityError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        Ok(Identity {
            id: UserId(row.id),
            email: EmailAddress::new(row.email)?,
            full_name: FullName::new(row.full_name)?,
            phone: row.phone,
            password_hash: row.password_hash,
            roles: RoleFlags {
                is_doctor: row.is_doctor,
                is_patient: row.is_patient,
            },
            email_verified: row.is_email_verified,
            created_at: row.created_at,
        })
    }
}

pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn create(&self, identity: Identity) -> Result<Identity, IdentityError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, phone, password_hash, is_doctor, is_patient, is_email_verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(identity.id.0)
        .bind(identity.email.as_str())
        .bind(identity.full_name.as_str())
        .bind(identity.phone.as_deref())
        .bind(&identity.password_hash)
        .bind(identity.roles.is_doctor)
        .bind(identity.roles.is_patient)
        .bind(identity.email_verified)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return IdentityError::EmailAlreadyExists(identity.email.as_str().to_string());
                }
            }
            IdentityError::DatabaseError(e.to_string())
        })?;

        Ok(identity)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<Identity>, IdentityError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", IDENTITY_COLUMNS);

        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        row.map(Identity::try_from).transpose()
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Identity>, IdentityError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", IDENTITY_COLUMNS);

        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        row.map(Identity::try_from).transpose()
    }

    async fn mark_email_verified(&self, id: &UserId) -> Result<(), IdentityError> {
        let result = sqlx::query("UPDATE users SET is_email_verified = TRUE WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn update_password(
        &self,
        id: &UserId,
        password_hash: &str,
    ) -> Result<(), IdentityError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id.0)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
