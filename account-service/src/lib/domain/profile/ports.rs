use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use crate::identity::models::Identity;
use crate::identity::models::Role;
use crate::identity::models::UserId;
use crate::profile::errors::ProfileError;
use crate::profile::models::Profile;
use crate::profile::models::ProfileChanges;
use crate::profile::models::ProfileView;

/// Port for profile operations on the acting identity.
#[async_trait]
pub trait ProfileServicePort: Send + Sync + 'static {
    /// Load the role-specific profile of an identity.
    ///
    /// # Errors
    /// * `InvalidRole` - Role flags do not resolve to exactly one role
    /// * `IncompleteProfile` - Role is valid but no profile record exists
    async fn get(&self, identity: &Identity) -> Result<ProfileView, ProfileError>;

    /// Partially update the profile. Flattened keys are reconstructed first.
    ///
    /// # Errors
    /// * `EmptyPayload` - No fields at all
    /// * `InvalidRole` - Role flags do not resolve to exactly one role
    /// * `Validation` - Field-level errors
    /// * `IncompleteProfile` - No profile record to update
    async fn update(
        &self,
        identity: &Identity,
        payload: Map<String, Value>,
    ) -> Result<ProfileView, ProfileError>;

    /// Create the missing profile record of an identity.
    ///
    /// # Errors
    /// * `InvalidRole` - Role flags do not resolve to exactly one role
    /// * `Validation` - Field-level errors
    /// * `AlreadyExists` - The profile record exists already
    async fn create(
        &self,
        identity: &Identity,
        payload: Map<String, Value>,
    ) -> Result<ProfileView, ProfileError>;
}

/// Persistence for role-specific profiles.
///
/// Every method joins the owning identity and re-checks its role flags, so a
/// profile is never returned under a role the identity no longer has.
#[async_trait]
pub trait ProfileRepository: Send + Sync + 'static {
    /// # Returns
    /// None when the profile record of `role` does not exist
    async fn find(&self, user_id: &UserId, role: Role) -> Result<Option<Profile>, ProfileError>;

    /// Load, merge and persist in one transaction.
    ///
    /// # Returns
    /// The updated profile, or None when no profile record exists
    ///
    /// # Errors
    /// * `Validation` - Unknown specialty
    /// * `InvalidRole` - Stored role flags no longer match `changes`
    async fn update(
        &self,
        user_id: &UserId,
        changes: ProfileChanges,
    ) -> Result<Option<Profile>, ProfileError>;

    /// # Errors
    /// * `AlreadyExists` - A profile record exists already
    /// * `NotFound` - Identity does not exist
    /// * `Validation` - Unknown specialty
    async fn create(
        &self,
        user_id: &UserId,
        changes: ProfileChanges,
    ) -> Result<Profile, ProfileError>;
}
