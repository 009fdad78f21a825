//! Role classification and per-role payload shapes.
//!
//! Both roles are enumerated explicitly; adding a role is a compile error in
//! every match below until its payload shape exists.

use chrono::NaiveDate;
use serde_json::Map;
use serde_json::Value;

use crate::domain::fields::Access;
use crate::domain::fields::FieldPolicy;
use crate::domain::fields::FieldReader;
use crate::domain::fields::WriteMode;
use crate::identity::models::FullName;
use crate::identity::models::Identity;
use crate::identity::models::Role;
use crate::profile::errors::ProfileError;
use crate::profile::models::BloodGroup;
use crate::profile::models::DoctorChanges;
use crate::profile::models::Gender;
use crate::profile::models::OwnerChanges;
use crate::profile::models::PatientChanges;
use crate::profile::models::ProfileChanges;
use crate::profile::models::SpecialtyId;

const MAX_PHONE_LENGTH: usize = 20;

/// Nested `user` object of both profile shapes.
pub static OWNER_POLICY: FieldPolicy = FieldPolicy::new(&[
    ("id", Access::ReadOnly),
    ("email", Access::ReadOnly),
    ("email_verified", Access::ReadOnly),
    ("full_name", Access::ReadWrite),
    ("phone", Access::ReadWrite),
]);

pub static DOCTOR_POLICY: FieldPolicy = FieldPolicy::new(&[
    ("role", Access::ReadOnly),
    ("updated_at", Access::ReadOnly),
    ("user", Access::ReadWrite),
    ("specialty", Access::ReadWrite),
    ("bio", Access::ReadWrite),
    ("experience_years", Access::ReadWrite),
    ("consultation_fee", Access::ReadWrite),
    ("is_available", Access::ReadWrite),
]);

pub static PATIENT_POLICY: FieldPolicy = FieldPolicy::new(&[
    ("role", Access::ReadOnly),
    ("updated_at", Access::ReadOnly),
    ("user", Access::ReadWrite),
    ("date_of_birth", Access::ReadWrite),
    ("gender", Access::ReadWrite),
    ("blood_group", Access::ReadWrite),
    ("address", Access::ReadWrite),
]);

/// Resolve the profile variant of an identity, failing closed.
///
/// # Errors
/// * `InvalidRole` - Both or neither role flag is set
pub fn classify(identity: &Identity) -> Result<Role, ProfileError> {
    identity.roles.classify().map_err(ProfileError::InvalidRole)
}

pub fn field_policy(role: Role) -> &'static FieldPolicy {
    match role {
        Role::Doctor => &DOCTOR_POLICY,
        Role::Patient => &PATIENT_POLICY,
    }
}

/// Validate a (reconstructed) payload against the shape of `role`.
///
/// # Errors
/// * `Validation` - One or more fields have bad values
pub fn parse_changes(
    role: Role,
    payload: &Map<String, Value>,
    mode: WriteMode,
) -> Result<ProfileChanges, ProfileError> {
    let mut reader = FieldReader::new(payload, field_policy(role), mode);
    let owner = read_owner(&mut reader);

    let changes = match role {
        Role::Doctor => ProfileChanges::Doctor(read_doctor(&mut reader, owner)),
        Role::Patient => ProfileChanges::Patient(read_patient(&mut reader, owner)),
    };

    reader.finish()?;
    Ok(changes)
}

fn read_owner(reader: &mut FieldReader<'_>) -> OwnerChanges {
    let Some(mut nested) = reader.nested("user", &OWNER_POLICY) else {
        return OwnerChanges::default();
    };

    let full_name = nested
        .field::<String>("full_name")
        .and_then(|name| match FullName::new(name) {
            Ok(name) => Some(name),
            Err(e) => {
                nested.reject("full_name", e.to_string());
                None
            }
        });

    let phone = nested.nullable::<String>("phone").map(|phone| {
        phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
    });
    if let Some(Some(value)) = &phone {
        if value.chars().count() > MAX_PHONE_LENGTH {
            nested.reject(
                "phone",
                format!(
                    "Ensure this field has no more than {} characters.",
                    MAX_PHONE_LENGTH
                ),
            );
        }
    }

    reader.absorb(nested);
    OwnerChanges { full_name, phone }
}

fn read_doctor(reader: &mut FieldReader<'_>, owner: OwnerChanges) -> DoctorChanges {
    let specialty = reader.nullable::<i64>("specialty").map(|id| id.map(SpecialtyId));
    let bio = reader.nullable::<String>("bio");

    let experience_years = reader.field::<i32>("experience_years");
    if matches!(experience_years, Some(years) if years < 0) {
        reader.reject(
            "experience_years",
            "Ensure this value is greater than or equal to 0.",
        );
    }

    let consultation_fee = reader.field::<i64>("consultation_fee");
    if matches!(consultation_fee, Some(fee) if fee < 0) {
        reader.reject(
            "consultation_fee",
            "Ensure this value is greater than or equal to 0.",
        );
    }

    DoctorChanges {
        owner,
        specialty,
        bio,
        experience_years,
        consultation_fee,
        is_available: reader.field::<bool>("is_available"),
    }
}

fn read_patient(reader: &mut FieldReader<'_>, owner: OwnerChanges) -> PatientChanges {
    let date_of_birth = reader.nullable::<NaiveDate>("date_of_birth");
    if let Some(Some(date)) = date_of_birth {
        if date > chrono::Utc::now().date_naive() {
            reader.reject("date_of_birth", "Date of birth cannot be in the future.");
        }
    }

    let gender = reader
        .nullable::<String>("gender")
        .map(|value| match value {
            None => None,
            Some(label) => {
                let parsed = Gender::parse(&label);
                if parsed.is_none() {
                    reader.reject("gender", format!("\"{}\" is not a valid choice.", label));
                }
                parsed
            }
        });

    let blood_group = reader
        .nullable::<String>("blood_group")
        .map(|value| match value {
            None => None,
            Some(label) => {
                let parsed = BloodGroup::parse(&label);
                if parsed.is_none() {
                    reader.reject(
                        "blood_group",
                        format!("\"{}\" is not a valid choice.", label),
                    );
                }
                parsed
            }
        });

    PatientChanges {
        owner,
        date_of_birth,
        gender,
        blood_group,
        address: reader.nullable::<String>("address"),
    }
}
