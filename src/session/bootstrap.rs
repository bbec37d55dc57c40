//! Startup: recover the session from the refresh cookie, or give up cleanly.

use serde_json::json;

use super::{Session, SessionState};
use crate::Result;
use crate::events::SessionEvent;

/// Result of [`Session::bootstrap`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A credential was already held; views were asked to reload.
    AlreadyAuthenticated,
    /// Refreshed and preloaded the shared lists.
    Authenticated,
    /// The refresh or the match history preload failed and all user state
    /// was cleared.
    Anonymous { reason: String },
}

impl BootstrapOutcome {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous { .. })
    }
}

impl Session {
    /// Establish the session at startup.
    ///
    /// With no credential held this refreshes, preloads the match history
    /// and friends list, then marks the user online. A failed refresh or
    /// match history load tears the session down and returns
    /// [`BootstrapOutcome::Anonymous`] without emitting a reload. The
    /// friends list and the online status are best effort: a failed
    /// friends load stays `Failed` in the cache for views to report.
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        if self.credentials.has_credential() {
            tracing::debug!("Credential already held, requesting dashboard reload");
            self.monitor.set(SessionState::Authenticated);
            self.events
                .emit(SessionEvent::DashboardReloadRequested, json!({}));
            return BootstrapOutcome::AlreadyAuthenticated;
        }

        self.monitor.set(SessionState::Bootstrapping);
        match self.establish().await {
            Ok(()) => {
                self.monitor.set(SessionState::Authenticated);
                tracing::info!("Session bootstrapped");
                BootstrapOutcome::Authenticated
            }
            Err(e) => {
                tracing::info!(error = %e, "Bootstrap failed, continuing anonymously");
                self.teardown().await;
                BootstrapOutcome::Anonymous {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn establish(&self) -> Result<()> {
        self.credentials.refresh().await?;
        self.api.match_history().await?;

        match self.api.friends().await {
            Err(e) if e.is_session_ending() => return Err(e),
            Err(e) => tracing::warn!(error = %e, "Friends list unavailable at startup"),
            Ok(_) => {}
        }
        match self.api.set_online_status(true).await {
            Err(e) if e.is_session_ending() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to set online status at startup");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }
}
