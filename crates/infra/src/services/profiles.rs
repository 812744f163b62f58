//! User profiles and registry documents.

use chrono::NaiveDate;
use thiserror::Error;

use agromarket_core::{DomainError, UserId};
use agromarket_parties::{RegistryDocument, RegistryKind, RegistryVerifier, UserProfile};

use crate::config::DEFAULT_EXPIRY_WINDOW_DAYS;
use crate::repository::{Repository, RepositoryError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile {0} not found")]
    NotFound(UserId),

    #[error("profile {0} already registered")]
    AlreadyRegistered(UserId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(RepositoryError),
}

impl From<RepositoryError> for ProfileError {
    fn from(value: RepositoryError) -> Self {
        ProfileError::Storage(value)
    }
}

#[derive(Debug)]
pub struct ProfileService<R, V> {
    profiles: R,
    verifier: V,
    expiry_window_days: u32,
}

impl<R, V> ProfileService<R, V>
where
    R: Repository<UserId, UserProfile>,
    V: RegistryVerifier,
{
    pub fn new(profiles: R, verifier: V) -> Self {
        Self {
            profiles,
            verifier,
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
        }
    }

    pub fn with_expiry_window(mut self, days: u32) -> Self {
        self.expiry_window_days = days;
        self
    }

    pub fn register(&self, profile: UserProfile) -> Result<UserProfile, ProfileError> {
        let user_id = profile.id_typed();
        self.profiles
            .insert(user_id, profile.clone())
            .map_err(|err| match err {
                RepositoryError::AlreadyExists => ProfileError::AlreadyRegistered(user_id),
                other => ProfileError::Storage(other),
            })?;

        tracing::info!(%user_id, role = ?profile.role(), "profile registered");
        Ok(profile)
    }

    pub fn get(&self, user_id: UserId) -> Result<UserProfile, ProfileError> {
        self.profiles.get(&user_id)?.ok_or(ProfileError::NotFound(user_id))
    }

    /// Verify a registry document and store it on the profile.
    ///
    /// Rejected documents leave the stored profile unchanged.
    pub fn submit_document(
        &self,
        user_id: UserId,
        kind: RegistryKind,
        number: impl Into<String>,
        expires_on: NaiveDate,
    ) -> Result<UserProfile, ProfileError> {
        let mut profile = self.get(user_id)?;

        if let Err(err) = profile.submit_document(&self.verifier, kind, number, expires_on) {
            tracing::info!(%user_id, %kind, %err, "registry document rejected");
            return Err(err.into());
        }

        self.profiles.update(user_id, profile.clone())?;
        tracing::info!(%user_id, %kind, %expires_on, "registry document stored");
        Ok(profile)
    }

    /// Documents of `user_id` that expire within the configured window.
    pub fn expiring_documents(
        &self,
        user_id: UserId,
        today: NaiveDate,
    ) -> Result<Vec<(RegistryKind, RegistryDocument)>, ProfileError> {
        let profile = self.get(user_id)?;
        Ok(profile
            .expiring_documents(today, self.expiry_window_days)
            .into_iter()
            .map(|(kind, doc)| (kind, doc.clone()))
            .collect())
    }

    /// Whether the user can file through the foreign-trade and tax portals.
    pub fn foreign_trade_ready(&self, user_id: UserId) -> Result<bool, ProfileError> {
        Ok(self.get(user_id)?.foreign_trade_ready())
    }
}
