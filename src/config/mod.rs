//! Client configuration: service endpoints and HTTP settings.
//!
//! ```rust,no_run
//! use pong_client::config::{ClientConfig, Endpoints};
//! use std::time::Duration;
//!
//! # fn example() -> pong_client::Result<()> {
//! let endpoints = Endpoints::from_env()?;
//! let config = ClientConfig::new(endpoints).with_timeout(Duration::from_secs(10));
//! # Ok(())
//! # }
//! ```

mod endpoints;

pub use endpoints::{DEFAULT_AVATAR_URL, DEFAULT_ORIGIN, Endpoints, EndpointsBuilder, FriendsRoute};

use std::time::Duration;

use crate::auth::AuthConfig;
use crate::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("pong-client/", env!("CARGO_PKG_VERSION"));
const TIMEOUT_ENV: &str = "PONG_REQUEST_TIMEOUT_SECS";

/// Settings shared by the credential store and the gateway.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    pub auth: AuthConfig,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            auth: AuthConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(Endpoints::from_env()?);
        config.auth = AuthConfig::from_env();

        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{TIMEOUT_ENV} must be a number of seconds, got '{raw}'"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the HTTP client. Cookies are kept in a per-client jar so the
    /// refresh and logout endpoints see the session cookie.
    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .cookie_store(true)
            .build()
            .map_err(Error::Network)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Endpoints::default())
    }
}
