//! Authentication header configuration.

use std::collections::BTreeMap;

/// Marker header the backend uses to tell delegated OAuth tokens apart.
pub const DEFAULT_DELEGATED_HEADER: (&str, &str) = ("X-42-Token", "true");

const DELEGATED_HEADERS_ENV: &str = "PONG_DELEGATED_HEADERS";

/// Configuration for strategy-specific headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Headers attached to every request made under
    /// [`AuthStrategy::DelegatedOAuth`](super::AuthStrategy::DelegatedOAuth).
    pub delegated_headers: BTreeMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            delegated_headers: [(
                DEFAULT_DELEGATED_HEADER.0.to_string(),
                DEFAULT_DELEGATED_HEADER.1.to_string(),
            )]
            .into_iter()
            .collect(),
        }
    }
}

impl AuthConfig {
    /// Defaults, then `PONG_DELEGATED_HEADERS` when set.
    ///
    /// Format: `"Header1: Value1\nHeader2: Value2"`. A set variable replaces
    /// the default marker header.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(DELEGATED_HEADERS_ENV) {
            let headers = parse_headers(&raw);
            if !headers.is_empty() {
                config.delegated_headers = headers;
            }
        }
        config
    }

    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }
}

/// Builder for AuthConfig.
#[derive(Default)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Add a delegated-strategy header.
    pub fn delegated_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .delegated_headers
            .insert(name.into(), value.into());
        self
    }

    /// Drop all delegated-strategy headers, including the default marker.
    pub fn clear_delegated_headers(mut self) -> Self {
        self.config.delegated_headers.clear();
        self
    }

    pub fn build(self) -> AuthConfig {
        self.config
    }
}

fn parse_headers(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}
