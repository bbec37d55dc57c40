//! Session lifecycle state and its observers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Where the session stands in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No credential, no strategy known.
    #[default]
    Anonymous,
    /// Refresh in flight at startup.
    Bootstrapping,
    Authenticated,
    /// Gateway-triggered refresh after a 401/403.
    Reauthenticating,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Reauthenticating)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Anonymous => "anonymous",
            Self::Bootstrapping => "bootstrapping",
            Self::Authenticated => "authenticated",
            Self::Reauthenticating => "reauthenticating",
        };
        f.write_str(name)
    }
}

/// Publishes [`SessionState`] transitions to any number of watchers.
#[derive(Clone, Debug)]
pub struct SessionMonitor {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMonitor {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> SessionState {
        *self.tx.borrow()
    }

    /// Move to `state`. Watchers are only woken on an actual change.
    pub fn set(&self, state: SessionState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::debug!(from = %current, to = %state, "Session state changed");
            *current = state;
            true
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}
