//! Process-wide credential holder.

use std::sync::RwLock;

use super::credential::RefreshResponse;
use super::{AuthStrategy, Credential};
use crate::config::Endpoints;
use crate::storage::ProfileStore;
use crate::{Error, Result};

#[derive(Default)]
struct Slot {
    credential: Option<Credential>,
    generation: u64,
}

/// Point-in-time view of the store: the credential and the generation it
/// was read at. Every install or clear bumps the generation.
#[derive(Clone, Debug)]
pub struct CredentialSnapshot {
    pub credential: Option<Credential>,
    pub generation: u64,
}

/// Holds the current access credential and performs refreshes.
///
/// The only writes are [`set_credential`](Self::set_credential),
/// [`clear`](Self::clear) and a successful [`refresh`](Self::refresh);
/// each replaces the slot under one lock, so readers never observe a
/// partial update. Concurrent refreshes are not deduplicated here; the
/// last one to complete wins.
pub struct CredentialStore {
    slot: RwLock<Slot>,
    http: reqwest::Client,
    endpoints: Endpoints,
    profile: ProfileStore,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("CredentialStore")
            .field("has_credential", &slot.credential.is_some())
            .field("generation", &slot.generation)
            .finish()
    }
}

impl CredentialStore {
    pub fn new(http: reqwest::Client, endpoints: Endpoints, profile: ProfileStore) -> Self {
        Self {
            slot: RwLock::new(Slot::default()),
            http,
            endpoints,
            profile,
        }
    }

    /// Replace the current credential. No I/O.
    pub fn set_credential(&self, token: impl Into<String>) -> Credential {
        let credential = Credential::new(token);
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.credential = Some(credential.clone());
        slot.generation += 1;
        credential
    }

    /// Current credential, if any. Never blocks on I/O.
    pub fn credential(&self) -> Option<Credential> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .credential
            .clone()
    }

    pub fn snapshot(&self) -> CredentialSnapshot {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        CredentialSnapshot {
            credential: slot.credential.clone(),
            generation: slot.generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).generation
    }

    pub fn has_credential(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .credential
            .is_some()
    }

    /// Drop the credential. Returns whether one was held.
    pub fn clear(&self) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        let had = slot.credential.take().is_some();
        slot.generation += 1;
        had
    }

    /// Strategy selected at login, read from client storage.
    pub async fn strategy(&self) -> Result<Option<AuthStrategy>> {
        self.profile.auth_strategy().await
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Exchange the session cookie for a new access credential.
    ///
    /// On any failure the previous credential, present or not, is left in
    /// place.
    pub async fn refresh(&self) -> Result<Credential> {
        let strategy = self.strategy().await?.ok_or(Error::StrategyUnset)?;
        let url = self.endpoints.refresh_url(strategy);

        tracing::debug!(strategy = strategy.name(), url = %url, "Refreshing access credential");

        let response = self.http.post(&url).send().await.map_err(|e| {
            tracing::warn!(strategy = strategy.name(), error = %e, "Refresh request failed");
            Error::RefreshFailed {
                status: None,
                message: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(strategy = strategy.name(), status, "Refresh rejected");
            return Err(Error::RefreshFailed {
                status: Some(status),
                message: body,
            });
        }

        let body: RefreshResponse = response.json().await.map_err(|e| Error::RefreshFailed {
            status: Some(status),
            message: format!("malformed refresh response: {}", e),
        })?;

        let credential = self.set_credential(body.access_token);
        tracing::info!(strategy = strategy.name(), "Access credential refreshed");
        Ok(credential)
    }
}
