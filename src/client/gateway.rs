//! Authenticated gateway: the single path from domain calls to the network.

use std::sync::Arc;

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::ApiRequest;
use crate::auth::{AuthConfig, AuthStrategy, Credential, CredentialStore};
use crate::events::{EventBus, SessionEnded, SessionEvent};
use crate::session::{SessionMonitor, SessionState};
use crate::{Error, Result};

/// Attaches credentials to requests and recovers one credential rejection.
///
/// Refresh calls never pass through here, so a rejected refresh cannot
/// loop back into another refresh.
pub struct Gateway {
    http: reqwest::Client,
    credentials: Arc<CredentialStore>,
    events: EventBus,
    monitor: SessionMonitor,
    auth_config: AuthConfig,
    refresh_gate: Mutex<()>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("credentials", &self.credentials)
            .field("state", &self.monitor.current())
            .finish()
    }
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

impl Gateway {
    pub fn new(
        http: reqwest::Client,
        credentials: Arc<CredentialStore>,
        events: EventBus,
        monitor: SessionMonitor,
        auth_config: AuthConfig,
    ) -> Self {
        Self {
            http,
            credentials,
            events,
            monitor,
            auth_config,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    /// Perform `request` with the current credential.
    ///
    /// A 401/403 triggers exactly one refresh and one replay. Error
    /// statuses after that surface as [`Error::RequestFailed`]; a replay
    /// that is rejected again ends the session.
    pub async fn call(&self, request: ApiRequest) -> Result<reqwest::Response> {
        let strategy = self.strategy().await?;
        let (credential, generation) = self.ensure_credential().await?;

        let response = self.send(&request, &credential, strategy).await?;
        if !is_auth_rejection(response.status()) {
            return Self::check(response).await;
        }

        tracing::warn!(
            status = response.status().as_u16(),
            method = %request.method,
            url = %request.url,
            "Access credential rejected, refreshing once"
        );

        let credential = match self.refresh_after_rejection(generation).await {
            Ok(credential) => credential,
            Err(e) => {
                self.end_session(&format!("refresh failed: {e}")).await;
                return Err(Error::SessionExpired);
            }
        };

        // All strategy headers are rebuilt for the replay.
        let strategy = self.strategy().await?;
        let replay = self.send(&request, &credential, strategy).await?;
        if is_auth_rejection(replay.status()) {
            tracing::warn!(
                status = replay.status().as_u16(),
                url = %request.url,
                "Refreshed credential rejected"
            );
            self.end_session("credential rejected after refresh").await;
            return Err(Error::SessionExpired);
        }

        Self::check(replay).await
    }

    /// Run `request` on the runtime, detached from the caller.
    ///
    /// Used for calls that must complete even if the caller goes away,
    /// such as the offline status update on shutdown.
    pub fn spawn_call(self: &Arc<Self>, request: ApiRequest) -> JoinHandle<Result<StatusCode>> {
        let gateway = Arc::clone(self);
        tokio::spawn(async move {
            let response = gateway.call(request).await?;
            Ok(response.status())
        })
    }

    async fn strategy(&self) -> Result<AuthStrategy> {
        self.credentials
            .strategy()
            .await?
            .ok_or(Error::StrategyUnset)
    }

    /// Current credential, refreshing first if none is held.
    async fn ensure_credential(&self) -> Result<(Credential, u64)> {
        let snapshot = self.credentials.snapshot();
        if let Some(credential) = snapshot.credential {
            return Ok((credential, snapshot.generation));
        }

        let _gate = self.refresh_gate.lock().await;
        let snapshot = self.credentials.snapshot();
        if let Some(credential) = snapshot.credential {
            return Ok((credential, snapshot.generation));
        }

        tracing::debug!("No access credential held, refreshing before request");
        match self.credentials.refresh().await {
            Ok(credential) => {
                self.monitor.set(SessionState::Authenticated);
                Ok((credential, self.credentials.generation()))
            }
            Err(Error::StrategyUnset) => Err(Error::StrategyUnset),
            Err(e) => Err(Error::SessionUnavailable {
                source: Box::new(e),
            }),
        }
    }

    /// Refresh after a rejection observed at `generation`.
    ///
    /// If another caller already replaced the credential since then, that
    /// credential is reused instead of refreshing again.
    async fn refresh_after_rejection(&self, generation: u64) -> Result<Credential> {
        let _gate = self.refresh_gate.lock().await;

        let snapshot = self.credentials.snapshot();
        if snapshot.generation != generation
            && let Some(credential) = snapshot.credential
        {
            tracing::debug!("Credential already refreshed by a concurrent call");
            return Ok(credential);
        }

        self.monitor.set(SessionState::Reauthenticating);
        let credential = self.credentials.refresh().await?;
        self.monitor.set(SessionState::Authenticated);
        Ok(credential)
    }

    async fn send(
        &self,
        request: &ApiRequest,
        credential: &Credential,
        strategy: AuthStrategy,
    ) -> Result<reqwest::Response> {
        let headers = request.merged_headers(
            &strategy.extra_headers(&self.auth_config),
            &credential.bearer(),
        )?;

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status().as_u16(),
            "Gateway request completed"
        );
        Ok(response)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Drop the credential and user-identifying storage, then broadcast.
    async fn end_session(&self, reason: &str) {
        self.credentials.clear();
        if let Err(e) = self.credentials.profile().clear().await {
            tracing::warn!(error = %e, "Failed to clear client storage on session end");
        }
        self.monitor.set(SessionState::Anonymous);
        tracing::info!(reason, "Session ended");
        let payload = SessionEnded {
            reason: reason.to_string(),
        };
        if let Err(e) = self.events.emit_with(SessionEvent::SessionEnded, &payload) {
            tracing::warn!(error = %e, "Failed to broadcast session end");
        }
    }
}
