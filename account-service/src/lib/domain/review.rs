//! Doctor reviews written by patients.
//!
//! Only the field rules live here: which doctor a review is about is fixed
//! when the review is written, so `doctor` is writable on create and read-only
//! afterwards. Review storage and listing belong to the reviews collaborator,
//! which parses its payloads with [`ReviewDraft::parse`] and builds or merges
//! reviews with [`Review::create`] and [`Review::apply`]; that is why these
//! types are public while nothing else in this crate calls them.

use chrono::DateTime;
use chrono::Utc;
use serde_json::Map;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::fields::Access;
use crate::domain::fields::FieldErrors;
use crate::domain::fields::FieldPolicy;
use crate::domain::fields::FieldReader;
use crate::domain::fields::WriteMode;
use crate::identity::models::UserId;

pub static REVIEW_POLICY: FieldPolicy = FieldPolicy::new(&[
    ("id", Access::ReadOnly),
    ("patient", Access::ReadOnly),
    ("created_at", Access::ReadOnly),
    ("doctor", Access::WriteOnCreate),
    ("rating", Access::ReadWrite),
    ("comment", Access::ReadWrite),
]);

/// Star rating, 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub doctor: UserId,
    pub patient: UserId,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted from a review payload under a given [`WriteMode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewDraft {
    pub doctor: Option<UserId>,
    pub rating: Option<Rating>,
    pub comment: Option<Option<String>>,
}

impl ReviewDraft {
    /// # Errors
    /// Field errors for bad values
    pub fn parse(payload: &Map<String, Value>, mode: WriteMode) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(payload, &REVIEW_POLICY, mode);

        let doctor = reader
            .field::<String>("doctor")
            .and_then(|raw| match UserId::from_string(&raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    reader.reject("doctor", format!("\"{}\" is not a valid UUID.", raw));
                    None
                }
            });

        let rating = reader
            .field::<i64>("rating")
            .and_then(|raw| match Rating::new(raw) {
                Some(rating) => Some(rating),
                None => {
                    reader.reject(
                        "rating",
                        format!(
                            "Ensure this value is between {} and {}.",
                            Rating::MIN,
                            Rating::MAX
                        ),
                    );
                    None
                }
            });

        let comment = reader.nullable::<String>("comment");

        reader.finish()?;
        Ok(Self {
            doctor,
            rating,
            comment,
        })
    }
}

impl Review {
    /// # Errors
    /// `doctor` and `rating` are required on create
    pub fn create(patient: UserId, draft: ReviewDraft) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        if draft.doctor.is_none() {
            errors.add("doctor", "This field is required.");
        }
        if draft.rating.is_none() {
            errors.add("rating", "This field is required.");
        }

        match (draft.doctor, draft.rating) {
            (Some(doctor), Some(rating)) => Ok(Self {
                id: Uuid::new_v4(),
                doctor,
                patient,
                rating,
                comment: draft.comment.flatten(),
                created_at: Utc::now(),
            }),
            _ => Err(errors),
        }
    }

    /// Merge an update draft. `doctor` is never changed here.
    pub fn apply(&mut self, draft: ReviewDraft) {
        if let Some(rating) = draft.rating {
            self.rating = rating;
        }
        if let Some(comment) = draft.comment {
            self.comment = comment;
        }
    }
}
