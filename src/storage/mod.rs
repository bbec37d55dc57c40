//! Durable client storage.
//!
//! The storage itself is an external collaborator; the session layer only
//! reads the authentication strategy from it and writes it on login and
//! logout. [`ProfileStore`] gives the typed view used by the rest of the
//! crate.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::sync::Arc;

use crate::Result;
use crate::auth::AuthStrategy;

/// Storage keys, kept compatible with the web client.
pub mod keys {
    pub const AUTH_METHOD: &str = "authMethod";
    pub const USERNAME: &str = "username";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const PROFILE_PICTURE: &str = "ProfilePicture";
    pub const DEFAULT_PICTURE: &str = "DefaultPicture";
    pub const TWO_FACTOR: &str = "2FA";
}

/// String key-value storage that outlives a session.
#[async_trait::async_trait]
pub trait ClientStorage: Send + Sync {
    /// Storage name for logging.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key, returning whether it was present.
    async fn remove(&self, key: &str) -> Result<bool>;

    async fn clear(&self) -> Result<()>;
}

/// Profile data recorded at login.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub profile_picture: Option<String>,
    pub two_factor: Option<bool>,
}

impl Profile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_picture(mut self, url: impl Into<String>) -> Self {
        self.profile_picture = Some(url.into());
        self
    }

    pub fn with_two_factor(mut self, enabled: bool) -> Self {
        self.two_factor = Some(enabled);
        self
    }
}

/// Typed accessors over a [`ClientStorage`].
#[derive(Clone)]
pub struct ProfileStore {
    storage: Arc<dyn ClientStorage>,
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("storage", &self.storage.name())
            .finish()
    }
}

impl ProfileStore {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn storage(&self) -> &Arc<dyn ClientStorage> {
        &self.storage
    }

    /// The selected strategy. Unknown stored values read as unset.
    pub async fn auth_strategy(&self) -> Result<Option<AuthStrategy>> {
        let raw = self.storage.get(keys::AUTH_METHOD).await?;
        Ok(raw.and_then(|value| match value.parse() {
            Ok(strategy) => Some(strategy),
            Err(_) => {
                tracing::warn!(value = %value, "Ignoring unknown stored auth method");
                None
            }
        }))
    }

    pub async fn set_auth_strategy(&self, strategy: AuthStrategy) -> Result<()> {
        self.storage
            .set(keys::AUTH_METHOD, strategy.storage_value())
            .await
    }

    pub async fn username(&self) -> Result<Option<String>> {
        self.storage.get(keys::USERNAME).await
    }

    pub async fn display_name(&self) -> Result<Option<String>> {
        self.storage.get(keys::DISPLAY_NAME).await
    }

    pub async fn profile_picture(&self) -> Result<Option<String>> {
        self.storage.get(keys::PROFILE_PICTURE).await
    }

    pub async fn default_picture(&self) -> Result<Option<String>> {
        self.storage.get(keys::DEFAULT_PICTURE).await
    }

    pub async fn set_default_picture(&self, url: &str) -> Result<()> {
        self.storage.set(keys::DEFAULT_PICTURE, url).await
    }

    /// Locally cached two-factor flag; the server remains authoritative.
    pub async fn two_factor(&self) -> Result<Option<bool>> {
        Ok(self
            .storage
            .get(keys::TWO_FACTOR)
            .await?
            .map(|v| v.eq_ignore_ascii_case("true")))
    }

    pub async fn set_two_factor(&self, enabled: bool) -> Result<()> {
        self.storage
            .set(keys::TWO_FACTOR, if enabled { "true" } else { "false" })
            .await
    }

    /// Record the strategy and profile chosen at login.
    pub async fn record_login(&self, strategy: AuthStrategy, profile: &Profile) -> Result<()> {
        self.set_auth_strategy(strategy).await?;
        if let Some(username) = &profile.username {
            self.storage.set(keys::USERNAME, username).await?;
        }
        if let Some(name) = &profile.display_name {
            self.storage.set(keys::DISPLAY_NAME, name).await?;
        }
        if let Some(url) = &profile.profile_picture {
            self.storage.set(keys::PROFILE_PICTURE, url).await?;
        }
        if let Some(enabled) = profile.two_factor {
            self.set_two_factor(enabled).await?;
        }
        Ok(())
    }

    pub async fn profile(&self) -> Result<Profile> {
        Ok(Profile {
            username: self.username().await?,
            display_name: self.display_name().await?,
            profile_picture: self.profile_picture().await?,
            two_factor: self.two_factor().await?,
        })
    }

    /// Forget everything, including the strategy.
    pub async fn clear(&self) -> Result<()> {
        self.storage.clear().await
    }
}
