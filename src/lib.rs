//! # pong-client
//!
//! Client session and synchronization layer for the pong web client.
//!
//! The crate keeps a short-lived access credential across two login
//! strategies, routes every authenticated call through a [`Gateway`] that
//! refreshes and replays once on rejection, and shares lazily loaded state
//! (friends list, match history) between independent views through a
//! [`Cache`] and an [`EventBus`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pong_client::{BootstrapOutcome, Session, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pong_client::Error> {
//!     let session = Session::from_env()?;
//!
//!     session.events().on(SessionEvent::SessionEnded, |payload| {
//!         println!("signed out: {payload}");
//!         Ok(())
//!     });
//!
//!     match session.bootstrap().await {
//!         BootstrapOutcome::Anonymous { reason } => println!("please log in ({reason})"),
//!         _ => {
//!             for friend in session.api().friends().await? {
//!                 println!("{} is {:?}", friend.username, friend.online);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod events;
pub mod prelude;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use api::{
    Api, FRIENDS_KEY, Friend, FriendStatus, MATCHES_KEY, MatchRecord, Presence, SharedState,
    validate_input,
};
pub use auth::{AuthConfig, AuthStrategy, Credential, CredentialSnapshot, CredentialStore};
pub use cache::{Cache, EntryStatus};
pub use client::{ApiRequest, Gateway};
pub use config::{ClientConfig, Endpoints, FriendsRoute};
pub use events::{EmitReport, EventBus, SessionEvent, Subscription};
pub use session::{BootstrapOutcome, Session, SessionBuilder, SessionMonitor, SessionState};
pub use storage::{ClientStorage, FileStorage, MemoryStorage, Profile, ProfileStore};

/// Error type for pong-client operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No login strategy is recorded; the user has to log in.
    #[error("No authentication method selected, please log in")]
    StrategyUnset,

    /// The refresh endpoint rejected the session cookie or was unreachable.
    #[error("Credential refresh failed{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RefreshFailed {
        status: Option<u16>,
        message: String,
    },

    /// No credential was held and obtaining one failed.
    #[error("Session unavailable: {source}")]
    SessionUnavailable { source: Box<Error> },

    /// The credential was still rejected after a refresh.
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// The server answered with an error status.
    #[error("Request failed (HTTP {status}): {body}")]
    RequestFailed { status: u16, body: String },

    /// User input rejected before sending.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request could not be built (bad header name or value).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A cache producer failed; every caller that joined it sees this.
    #[error("Failed to load '{key}': {source}")]
    Population { key: String, source: Arc<Error> },

    /// Network connectivity or request failed.
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Client storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to parse a stored or configured value.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The session is gone; escalate to the login screen.
    Session,
    /// The server refused this request; show a notice and carry on.
    Request,
    /// Network or server-side errors that may succeed on retry
    Transient,
    /// Configuration, parsing, or setup errors
    Configuration,
    /// Internal errors (IO, JSON, storage)
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::StrategyUnset
            | Error::RefreshFailed { .. }
            | Error::SessionUnavailable { .. }
            | Error::SessionExpired => ErrorCategory::Session,

            Error::Population { source, .. } => source.category(),

            Error::RequestFailed {
                status: 429 | 500..=599,
                ..
            }
            | Error::Network(_) => ErrorCategory::Transient,

            Error::RequestFailed { .. } | Error::InvalidInput(_) | Error::InvalidRequest(_) => {
                ErrorCategory::Request
            }

            Error::Config(_) | Error::Parse(_) => ErrorCategory::Configuration,

            Error::Json(_) | Error::Io(_) | Error::Storage(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the caller should treat the user as logged out.
    pub fn is_session_ending(&self) -> bool {
        self.category() == ErrorCategory::Session
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::RequestFailed { status, .. } => Some(*status),
            Error::RefreshFailed { status, .. } => *status,
            Error::SessionUnavailable { source } => source.status_code(),
            Error::Population { source, .. } => source.status_code(),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
