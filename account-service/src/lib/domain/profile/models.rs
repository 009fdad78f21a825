use std::fmt;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identity::errors::RoleError;
use crate::identity::models::EmailAddress;
use crate::identity::models::FullName;
use crate::identity::models::Identity;
use crate::identity::models::Role;
use crate::identity::models::UserId;
use crate::profile::errors::ProfileError;

/// Reference to a row of the specialty catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecialtyId(pub i64);

impl fmt::Display for SpecialtyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|group| group.as_str() == value)
    }
}

/// The identity a profile belongs to, joined eagerly on every load.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOwner {
    pub id: UserId,
    pub email: EmailAddress,
    pub full_name: FullName,
    pub phone: Option<String>,
    pub email_verified: bool,
}

impl From<&Identity> for ProfileOwner {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            full_name: identity.full_name.clone(),
            phone: identity.phone.clone(),
            email_verified: identity.email_verified,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoctorProfile {
    pub owner: ProfileOwner,
    pub specialty: Option<SpecialtyId>,
    pub bio: Option<String>,
    pub experience_years: i32,
    /// Minor currency units
    pub consultation_fee: i64,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientProfile {
    pub owner: ProfileOwner,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub address: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Role-specific profile, 1:1 with an identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Doctor(DoctorProfile),
    Patient(PatientProfile),
}

impl Profile {
    /// A profile with every optional field empty, used when completing
    /// registration.
    pub fn blank(owner: ProfileOwner, role: Role) -> Self {
        let now = Utc::now();

        match role {
            Role::Doctor => Profile::Doctor(DoctorProfile {
                owner,
                specialty: None,
                bio: None,
                experience_years: 0,
                consultation_fee: 0,
                is_available: true,
                updated_at: now,
            }),
            Role::Patient => Profile::Patient(PatientProfile {
                owner,
                date_of_birth: None,
                gender: None,
                blood_group: None,
                address: None,
                updated_at: now,
            }),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Profile::Doctor(_) => Role::Doctor,
            Profile::Patient(_) => Role::Patient,
        }
    }

    pub fn owner(&self) -> &ProfileOwner {
        match self {
            Profile::Doctor(doctor) => &doctor.owner,
            Profile::Patient(patient) => &patient.owner,
        }
    }

    /// Merge a partial update. Fields absent from `changes` keep their value.
    ///
    /// # Errors
    /// * `InvalidRole` - Changes were parsed for the other role
    pub fn apply(&mut self, changes: ProfileChanges) -> Result<(), ProfileError> {
        match (self, changes) {
            (Profile::Doctor(doctor), ProfileChanges::Doctor(changes)) => {
                changes.owner.apply(&mut doctor.owner);
                if let Some(specialty) = changes.specialty {
                    doctor.specialty = specialty;
                }
                if let Some(bio) = changes.bio {
                    doctor.bio = bio;
                }
                if let Some(experience_years) = changes.experience_years {
                    doctor.experience_years = experience_years;
                }
                if let Some(consultation_fee) = changes.consultation_fee {
                    doctor.consultation_fee = consultation_fee;
                }
                if let Some(is_available) = changes.is_available {
                    doctor.is_available = is_available;
                }
                doctor.updated_at = Utc::now();
                Ok(())
            }
            (Profile::Patient(patient), ProfileChanges::Patient(changes)) => {
                changes.owner.apply(&mut patient.owner);
                if let Some(date_of_birth) = changes.date_of_birth {
                    patient.date_of_birth = date_of_birth;
                }
                if let Some(gender) = changes.gender {
                    patient.gender = gender;
                }
                if let Some(blood_group) = changes.blood_group {
                    patient.blood_group = blood_group;
                }
                if let Some(address) = changes.address {
                    patient.address = address;
                }
                patient.updated_at = Utc::now();
                Ok(())
            }
            (profile, changes) => Err(ProfileError::InvalidRole(RoleError::Mismatch {
                expected: changes.role(),
                found: profile.role(),
            })),
        }
    }
}

/// Nested `user` part of a profile update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnerChanges {
    pub full_name: Option<FullName>,
    pub phone: Option<Option<String>>,
}

impl OwnerChanges {
    fn apply(self, owner: &mut ProfileOwner) {
        if let Some(full_name) = self.full_name {
            owner.full_name = full_name;
        }
        if let Some(phone) = self.phone {
            owner.phone = phone;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.phone.is_none()
    }
}

/// `Some(None)` on a nullable field clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorChanges {
    pub owner: OwnerChanges,
    pub specialty: Option<Option<SpecialtyId>>,
    pub bio: Option<Option<String>>,
    pub experience_years: Option<i32>,
    pub consultation_fee: Option<i64>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientChanges {
    pub owner: OwnerChanges,
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub gender: Option<Option<Gender>>,
    pub blood_group: Option<Option<BloodGroup>>,
    pub address: Option<Option<String>>,
}

/// Validated partial profile, shaped for exactly one role.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileChanges {
    Doctor(DoctorChanges),
    Patient(PatientChanges),
}

impl ProfileChanges {
    pub fn role(&self) -> Role {
        match self {
            ProfileChanges::Doctor(_) => Role::Doctor,
            ProfileChanges::Patient(_) => Role::Patient,
        }
    }

    /// Specialty newly assigned by these changes, to be checked against the
    /// catalogue.
    pub fn assigned_specialty(&self) -> Option<SpecialtyId> {
        match self {
            ProfileChanges::Doctor(changes) => changes.specialty.flatten(),
            ProfileChanges::Patient(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerView {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorView {
    pub user: OwnerView,
    pub specialty: Option<SpecialtyId>,
    pub bio: Option<String>,
    pub experience_years: i32,
    pub consultation_fee: i64,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientView {
    pub user: OwnerView,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub address: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Serialized profile; the shape is fixed by the `role` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ProfileView {
    Doctor(DoctorView),
    Patient(PatientView),
}

impl From<&ProfileOwner> for OwnerView {
    fn from(owner: &ProfileOwner) -> Self {
        Self {
            id: owner.id.to_string(),
            email: owner.email.as_str().to_string(),
            full_name: owner.full_name.as_str().to_string(),
            phone: owner.phone.clone(),
            email_verified: owner.email_verified,
        }
    }
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        match profile {
            Profile::Doctor(doctor) => ProfileView::Doctor(DoctorView {
                user: OwnerView::from(&doctor.owner),
                specialty: doctor.specialty,
                bio: doctor.bio.clone(),
                experience_years: doctor.experience_years,
                consultation_fee: doctor.consultation_fee,
                is_available: doctor.is_available,
                updated_at: doctor.updated_at,
            }),
            Profile::Patient(patient) => ProfileView::Patient(PatientView {
                user: OwnerView::from(&patient.owner),
                date_of_birth: patient.date_of_birth,
                gender: patient.gender,
                blood_group: patient.blood_group,
                address: patient.address.clone(),
                updated_at: patient.updated_at,
            }),
        }
    }
}
