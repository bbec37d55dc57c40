//! Session facade: one credential store, gateway, cache and event bus with a
//! shared lifecycle.
//!
//! ```rust,no_run
//! use pong_client::session::{BootstrapOutcome, Session};
//!
//! # async fn example() -> pong_client::Result<()> {
//! let session = Session::from_env()?;
//! if let BootstrapOutcome::Anonymous { reason } = session.bootstrap().await {
//!     println!("please log in ({reason})");
//! }
//! # Ok(())
//! # }
//! ```

mod bootstrap;
mod state;

pub use bootstrap::BootstrapOutcome;
pub use state::{SessionMonitor, SessionState};

use std::sync::Arc;

use serde::Deserialize;

use crate::api::{Api, SharedState};
use crate::auth::{AuthStrategy, CredentialStore};
use crate::cache::Cache;
use crate::client::Gateway;
use crate::config::ClientConfig;
use crate::events::{EventBus, SessionEnded, SessionEvent, Subscription};
use crate::storage::{ClientStorage, MemoryStorage, Profile, ProfileStore};
use crate::{Error, Result};

/// Everything tied to one logged-in (or anonymous) user.
pub struct Session {
    http: reqwest::Client,
    credentials: Arc<CredentialStore>,
    gateway: Arc<Gateway>,
    api: Api,
    cache: Cache<SharedState>,
    events: EventBus,
    monitor: SessionMonitor,
    profile: ProfileStore,
    on_session_end: Subscription,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.monitor.current())
            .field("credentials", &self.credentials)
            .field("cache", &self.cache)
            .finish()
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Session with in-memory storage.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn cache(&self) -> &Cache<SharedState> {
        &self.cache
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    pub fn state(&self) -> SessionState {
        self.monitor.current()
    }

    /// Record a completed login.
    ///
    /// The credential exchange itself happens on the auth server; this
    /// stores the chosen strategy and profile, and installs `access_token`
    /// when the login response carried one.
    pub async fn login(
        &self,
        strategy: AuthStrategy,
        profile: &Profile,
        access_token: Option<&str>,
    ) -> Result<()> {
        if let Some(current) = self.credentials.strategy().await?
            && current != strategy
            && self.credentials.has_credential()
        {
            return Err(Error::InvalidInput(format!(
                "already logged in with {}, log out first",
                current
            )));
        }

        self.profile.record_login(strategy, profile).await?;
        if let Some(token) = access_token {
            self.credentials.set_credential(token);
            self.monitor.set(SessionState::Authenticated);
        }
        tracing::info!(strategy = strategy.name(), username = ?profile.username, "Login recorded");
        Ok(())
    }

    /// End the session.
    ///
    /// Delegated OAuth sessions are cleared locally. Primary credential
    /// sessions are first logged out on the server with the session
    /// cookie; a rejected logout keeps the session and returns
    /// [`Error::RequestFailed`].
    pub async fn logout(&self) -> Result<()> {
        let strategy = self.credentials.strategy().await?;
        let mut already_ended = false;

        if let Some(strategy) = strategy
            && strategy.has_server_logout()
        {
            let url = self.credentials.endpoints().logout_url();
            let response = self.http.post(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(status = status.as_u16(), "Server rejected logout");
                return Err(Error::RequestFailed {
                    status: status.as_u16(),
                    body,
                });
            }

            if let Err(e) = self.api.set_online_status(false).await {
                // The gateway has already announced the end of the session.
                already_ended = matches!(e, Error::SessionExpired);
                tracing::warn!(error = %e, "Failed to set offline status during logout");
            }
        }

        self.teardown().await;
        if !already_ended {
            let ended = SessionEnded {
                reason: "logout".into(),
            };
            self.events.emit_with(SessionEvent::SessionEnded, &ended)?;
        }
        tracing::info!(strategy = ?strategy, "Logged out");
        Ok(())
    }

    /// Fallback picture for users without one.
    ///
    /// Read from client storage, or fetched once from the avatar service and
    /// stored. That service is third party and unauthenticated, so its
    /// failures are logged and yield `None`.
    pub async fn default_picture(&self) -> Result<Option<String>> {
        if let Some(url) = self.profile.default_picture().await? {
            return Ok(Some(url));
        }

        let endpoint = &self.credentials.endpoints().avatar;
        match fetch_avatar(&self.http, endpoint).await {
            Ok(url) => {
                self.profile.set_default_picture(&url).await?;
                Ok(Some(url))
            }
            Err(e) => {
                tracing::warn!(error = %e, endpoint = %endpoint, "Failed to fetch default picture");
                Ok(None)
            }
        }
    }

    /// Forget the credential, client storage and cached lists.
    pub async fn teardown(&self) {
        self.credentials.clear();
        if let Err(e) = self.profile.clear().await {
            tracing::warn!(error = %e, "Failed to clear client storage");
        }
        self.cache.clear();
        self.monitor.set(SessionState::Anonymous);
        tracing::debug!("Session state torn down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.events.off(self.on_session_end);
    }
}

#[derive(Deserialize)]
struct AvatarResponse {
    message: String,
}

async fn fetch_avatar(http: &reqwest::Client, endpoint: &str) -> Result<String> {
    let body: AvatarResponse = http
        .get(endpoint)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(body.message)
}

/// Builder for [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<ClientConfig>,
    storage: Option<Arc<dyn ClientStorage>>,
    http: Option<reqwest::Client>,
    events: Option<EventBus>,
}

impl SessionBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Durable client storage. Defaults to [`MemoryStorage`].
    pub fn storage(mut self, storage: Arc<dyn ClientStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use an existing HTTP client instead of one built from the config.
    /// It must keep cookies for refresh and logout to work.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Share an event bus with other components.
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Result<Session> {
        let config = self.config.unwrap_or_default();
        config.endpoints.validate()?;

        let http = match self.http {
            Some(http) => http,
            None => config.http_client()?,
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let profile = ProfileStore::new(storage);
        let events = self.events.unwrap_or_default();
        let monitor = SessionMonitor::new();
        let cache = Cache::new();

        let credentials = Arc::new(CredentialStore::new(
            http.clone(),
            config.endpoints.clone(),
            profile.clone(),
        ));
        let gateway = Arc::new(Gateway::new(
            http.clone(),
            Arc::clone(&credentials),
            events.clone(),
            monitor.clone(),
            config.auth.clone(),
        ));
        let api = Api::new(Arc::clone(&gateway), cache.clone());

        let ended_cache = cache.clone();
        let on_session_end = events.on(SessionEvent::SessionEnded, move |_| {
            ended_cache.clear();
            Ok(())
        });

        tracing::debug!(storage = profile.storage().name(), "Session assembled");

        Ok(Session {
            http,
            credentials,
            gateway,
            api,
            cache,
            events,
            monitor,
            profile,
            on_session_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use serde_json::json;

    fn session() -> Session {
        Session::new(ClientConfig::new(Endpoints::local("http://127.0.0.1:9"))).unwrap()
    }

    #[tokio::test]
    async fn test_login_records_profile_and_credential() {
        let session = session();
        let profile = Profile::new("alice").with_display_name("Alice");

        session
            .login(AuthStrategy::PrimaryCredential, &profile, Some("tok"))
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.credentials().credential().unwrap().expose(), "tok");
        assert_eq!(
            session.profile().auth_strategy().await.unwrap(),
            Some(AuthStrategy::PrimaryCredential)
        );
        assert_eq!(session.profile().username().await.unwrap().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_strategy_cannot_change_while_logged_in() {
        let session = session();
        session
            .login(AuthStrategy::DelegatedOAuth, &Profile::new("a"), Some("tok"))
            .await
            .unwrap();

        let err = session
            .login(AuthStrategy::PrimaryCredential, &Profile::new("a"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delegated_logout_is_local() {
        let session = session();
        session
            .login(AuthStrategy::DelegatedOAuth, &Profile::new("a"), Some("tok"))
            .await
            .unwrap();
        session.cache().set("friends", SharedState::Friends(Vec::new()));

        session.logout().await.unwrap();

        assert!(!session.credentials().has_credential());
        assert_eq!(session.profile().auth_strategy().await.unwrap(), None);
        assert!(session.cache().is_empty());
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_session_end_event_clears_cache() {
        let session = session();
        session.cache().set("matches", SharedState::MatchHistory(Vec::new()));

        session
            .events()
            .emit(SessionEvent::SessionEnded, json!({"reason": "test"}));
        assert!(session.cache().is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let events = EventBus::new();
        let session = Session::builder()
            .config(ClientConfig::new(Endpoints::local("http://127.0.0.1:9")))
            .events(events.clone())
            .build()
            .unwrap();
        assert_eq!(events.subscriber_count(SessionEvent::SessionEnded), 1);

        drop(session);
        assert_eq!(events.subscriber_count(SessionEvent::SessionEnded), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_with_held_credential_requests_reload() {
        let session = session();
        session.credentials().set_credential("tok");

        let reloads = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = reloads.clone();
        session
            .events()
            .on(SessionEvent::DashboardReloadRequested, move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            });

        assert_eq!(session.bootstrap().await, BootstrapOutcome::AlreadyAuthenticated);
        assert_eq!(reloads.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_without_strategy_is_anonymous() {
        let session = session();
        let outcome = session.bootstrap().await;
        assert!(!outcome.is_authenticated());
        assert_eq!(session.state(), SessionState::Anonymous);
    }
}
