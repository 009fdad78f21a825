use async_trait::async_trait;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use sqlx::PgConnection;
use sqlx::PgPool;

use crate::domain::fields::FieldErrors;
use crate::identity::errors::RoleError;
use crate::identity::models::Identity;
use crate::identity::models::Role;
use crate::identity::models::UserId;
use crate::outbound::repositories::identity::IdentityRow;
use crate::outbound::repositories::identity::IDENTITY_COLUMNS;
use crate::profile::errors::ProfileError;
use crate::profile::models::BloodGroup;
use crate::profile::models::DoctorProfile;
use crate::profile::models::Gender;
use crate::profile::models::PatientProfile;
use crate::profile::models::Profile;
use crate::profile::models::ProfileChanges;
use crate::profile::models::ProfileOwner;
use crate::profile::models::SpecialtyId;
use crate::profile::ports::ProfileRepository;

#[derive(Debug, sqlx::FromRow)]
struct DoctorRow {
    specialty_id: Option<i64>,
    bio: Option<String>,
    experience_years: i32,
    consultation_fee: i64,
    is_available: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct PatientRow {
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    blood_group: Option<String>,
    address: Option<String>,
    updated_at: DateTime<Utc>,
}

impl DoctorRow {
    fn into_profile(self, owner: ProfileOwner) -> Profile {
        Profile::Doctor(DoctorProfile {
            owner,
            specialty: self.specialty_id.map(SpecialtyId),
            bio: self.bio,
            experience_years: self.experience_years,
            consultation_fee: self.consultation_fee,
            is_available: self.is_available,
            updated_at: self.updated_at,
        })
    }
}

impl PatientRow {
    fn into_profile(self, owner: ProfileOwner) -> Profile {
        Profile::Patient(PatientProfile {
            owner,
            date_of_birth: self.date_of_birth,
            // Values outside the choice lists read as unset.
            gender: self.gender.as_deref().and_then(Gender::parse),
            blood_group: self.blood_group.as_deref().and_then(BloodGroup::parse),
            address: self.address,
            updated_at: self.updated_at,
        })
    }
}

fn database_error(e: sqlx::Error) -> ProfileError {
    ProfileError::DatabaseError(e.to_string())
}

pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_identity(
        conn: &mut PgConnection,
        user_id: &UserId,
        lock: bool,
    ) -> Result<Option<Identity>, ProfileError> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = $1{}",
            IDENTITY_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );

        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(user_id.0)
            .fetch_optional(&mut *conn)
            .await
            .map_err(database_error)?;

        row.map(Identity::try_from)
            .transpose()
            .map_err(|e| ProfileError::DatabaseError(format!("corrupt user row: {}", e)))
    }

    /// Role flags are re-read from storage; a mismatch fails closed.
    fn ensure_role(identity: &Identity, expected: Role) -> Result<(), ProfileError> {
        let found = identity.roles.classify()?;
        if found != expected {
            return Err(ProfileError::InvalidRole(RoleError::Mismatch { expected, found }));
        }
        Ok(())
    }

    async fn load_profile(
        conn: &mut PgConnection,
        identity: &Identity,
        role: Role,
        lock: bool,
    ) -> Result<Option<Profile>, ProfileError> {
        let suffix = if lock { " FOR UPDATE" } else { "" };
        let owner = ProfileOwner::from(identity);

        match role {
            Role::Doctor => {
                let sql = format!(
                    "SELECT specialty_id, bio, experience_years, consultation_fee, is_available, updated_at \
                     FROM doctors WHERE user_id = $1{}",
                    suffix
                );
                let row = sqlx::query_as::<_, DoctorRow>(&sql)
                    .bind(identity.id.0)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(database_error)?;
                Ok(row.map(|row| row.into_profile(owner)))
            }
            Role::Patient => {
                let sql = format!(
                    "SELECT date_of_birth, gender, blood_group, address, updated_at \
                     FROM patients WHERE user_id = $1{}",
                    suffix
                );
                let row = sqlx::query_as::<_, PatientRow>(&sql)
                    .bind(identity.id.0)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(database_error)?;
                Ok(row.map(|row| row.into_profile(owner)))
            }
        }
    }

    async fn ensure_specialty(
        conn: &mut PgConnection,
        changes: &ProfileChanges,
    ) -> Result<(), ProfileError> {
        let Some(specialty) = changes.assigned_specialty() else {
            return Ok(());
        };

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM specialties WHERE id = $1)")
                .bind(specialty.0)
                .fetch_one(&mut *conn)
                .await
                .map_err(database_error)?;

        if !exists {
            return Err(ProfileError::Validation(FieldErrors::single(
                "specialty",
                format!("Invalid pk \"{}\" - object does not exist.", specialty),
            )));
        }
        Ok(())
    }

    async fn write_owner(conn: &mut PgConnection, owner: &ProfileOwner) -> Result<(), ProfileError> {
        sqlx::query("UPDATE users SET full_name = $2, phone = $3 WHERE id = $1")
            .bind(owner.id.0)
            .bind(owner.full_name.as_str())
            .bind(owner.phone.as_deref())
            .execute(&mut *conn)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn write_profile(
        conn: &mut PgConnection,
        profile: &Profile,
        insert: bool,
    ) -> Result<(), ProfileError> {
        let result = match profile {
            Profile::Doctor(doctor) => {
                let sql = if insert {
                    r#"
                    INSERT INTO doctors (user_id, specialty_id, bio, experience_years, consultation_fee, is_available, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#
                } else {
                    r#"
                    UPDATE doctors
                    SET specialty_id = $2, bio = $3, experience_years = $4,
                        consultation_fee = $5, is_available = $6, updated_at = $7
                    WHERE user_id = $1
                    "#
                };
                sqlx::query(sql)
                    .bind(doctor.owner.id.0)
                    .bind(doctor.specialty.map(|s| s.0))
                    .bind(doctor.bio.as_deref())
                    .bind(doctor.experience_years)
                    .bind(doctor.consultation_fee)
                    .bind(doctor.is_available)
                    .bind(doctor.updated_at)
                    .execute(&mut *conn)
                    .await
            }
            Profile::Patient(patient) => {
                let sql = if insert {
                    r#"
                    INSERT INTO patients (user_id, date_of_birth, gender, blood_group, address, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#
                } else {
                    r#"
                    UPDATE patients
                    SET date_of_birth = $2, gender = $3, blood_group = $4, address = $5, updated_at = $6
                    WHERE user_id = $1
                    "#
                };
                sqlx::query(sql)
                    .bind(patient.owner.id.0)
                    .bind(patient.date_of_birth)
                    .bind(patient.gender.map(|g| g.as_str()))
                    .bind(patient.blood_group.map(|b| b.as_str()))
                    .bind(patient.address.as_deref())
                    .bind(patient.updated_at)
                    .execute(&mut *conn)
                    .await
            }
        };

        result.map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return ProfileError::AlreadyExists;
                }
            }
            database_error(e)
        })?;

        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find(&self, user_id: &UserId, role: Role) -> Result<Option<Profile>, ProfileError> {
        let mut conn = self.pool.acquire().await.map_err(database_error)?;

        let Some(identity) = Self::load_identity(&mut conn, user_id, false).await? else {
            return Ok(None);
        };
        Self::ensure_role(&identity, role)?;

        Self::load_profile(&mut conn, &identity, role, false).await
    }

    async fn update(
        &self,
        user_id: &UserId,
        changes: ProfileChanges,
    ) -> Result<Option<Profile>, ProfileError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let Some(identity) = Self::load_identity(&mut tx, user_id, true).await? else {
            return Ok(None);
        };
        Self::ensure_role(&identity, changes.role())?;

        let Some(mut profile) =
            Self::load_profile(&mut tx, &identity, changes.role(), true).await?
        else {
            return Ok(None);
        };

        Self::ensure_specialty(&mut tx, &changes).await?;
        profile.apply(changes)?;

        Self::write_owner(&mut tx, profile.owner()).await?;
        Self::write_profile(&mut tx, &profile, false).await?;

        tx.commit().await.map_err(database_error)?;

        Ok(Some(profile))
    }

    async fn create(
        &self,
        user_id: &UserId,
        changes: ProfileChanges,
    ) -> Result<Profile, ProfileError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let identity = Self::load_identity(&mut tx, user_id, true)
            .await?
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;
        let role = changes.role();
        Self::ensure_role(&identity, role)?;

        if Self::load_profile(&mut tx, &identity, role, false)
            .await?
            .is_some()
        {
            return Err(ProfileError::AlreadyExists);
        }

        Self::ensure_specialty(&mut tx, &changes).await?;

        let mut profile = Profile::blank(ProfileOwner::from(&identity), role);
        profile.apply(changes)?;

        Self::write_owner(&mut tx, profile.owner()).await?;
        Self::write_profile(&mut tx, &profile, true).await?;

        tx.commit().await.map_err(database_error)?;

        Ok(profile)
    }
}
