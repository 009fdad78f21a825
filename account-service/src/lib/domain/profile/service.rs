use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use crate::domain::fields::WriteMode;
use crate::identity::models::Identity;
use crate::identity::models::Role;
use crate::profile::errors::ProfileError;
use crate::profile::models::ProfileChanges;
use crate::profile::models::ProfileView;
use crate::profile::payload::reconstruct;
use crate::profile::ports::ProfileRepository;
use crate::profile::ports::ProfileServicePort;
use crate::profile::router;

/// Domain service implementation for role-specific profiles.
pub struct ProfileService<PR>
where
    PR: ProfileRepository,
{
    repository: Arc<PR>,
    strict_flattened_keys: bool,
}

impl<PR> ProfileService<PR>
where
    PR: ProfileRepository,
{
    /// # Arguments
    /// * `repository` - Profile persistence implementation
    /// * `strict_flattened_keys` - Reject unparseable flattened keys instead
    ///   of dropping them
    pub fn new(repository: Arc<PR>, strict_flattened_keys: bool) -> Self {
        Self {
            repository,
            strict_flattened_keys,
        }
    }

    fn changes_from(
        &self,
        identity: &Identity,
        role: Role,
        payload: Map<String, Value>,
        mode: WriteMode,
    ) -> Result<ProfileChanges, ProfileError> {
        let reconstructed = reconstruct(payload);

        if !reconstructed.rejected.is_empty() {
            if self.strict_flattened_keys {
                return Err(ProfileError::Validation(reconstructed.rejection_errors()));
            }
            tracing::warn!(
                user_id = %identity.id,
                keys = ?reconstructed.rejected,
                "Dropping unparseable flattened keys"
            );
        }

        router::parse_changes(role, &reconstructed.payload, mode)
    }
}

#[async_trait]
impl<PR> ProfileServicePort for ProfileService<PR>
where
    PR: ProfileRepository,
{
    async fn get(&self, identity: &Identity) -> Result<ProfileView, ProfileError> {
        let role = router::classify(identity)?;

        let profile = self
            .repository
            .find(&identity.id, role)
            .await?
            .ok_or(ProfileError::IncompleteProfile)?;

        Ok(ProfileView::from(&profile))
    }

    async fn update(
        &self,
        identity: &Identity,
        payload: Map<String, Value>,
    ) -> Result<ProfileView, ProfileError> {
        if payload.is_empty() {
            return Err(ProfileError::EmptyPayload);
        }

        let role = router::classify(identity)?;
        let changes = self.changes_from(identity, role, payload, WriteMode::Update)?;

        let profile = self
            .repository
            .update(&identity.id, changes)
            .await?
            .ok_or(ProfileError::IncompleteProfile)?;

        tracing::info!(user_id = %identity.id, role = %role, "Profile updated");

        Ok(ProfileView::from(&profile))
    }

    async fn create(
        &self,
        identity: &Identity,
        payload: Map<String, Value>,
    ) -> Result<ProfileView, ProfileError> {
        let role = router::classify(identity)?;
        let changes = self.changes_from(identity, role, payload, WriteMode::Create)?;

        let profile = self.repository.create(&identity.id, changes).await?;

        tracing::info!(user_id = %identity.id, role = %role, "Profile created");

        Ok(ProfileView::from(&profile))
    }
}
