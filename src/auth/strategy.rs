//! Authentication strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::AuthConfig;

/// How the user authenticated; selects the refresh endpoint and any
/// strategy-specific request headers.
///
/// The serialized form matches the value kept in client storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthStrategy {
    /// Username/password login against the jwt service.
    #[serde(rename = "JWT")]
    PrimaryCredential,
    /// Login delegated to the 42 intranet OAuth provider.
    #[serde(rename = "42OAuth")]
    DelegatedOAuth,
}

impl AuthStrategy {
    pub fn all() -> &'static [AuthStrategy] {
        &[AuthStrategy::PrimaryCredential, AuthStrategy::DelegatedOAuth]
    }

    pub fn storage_value(&self) -> &'static str {
        match self {
            AuthStrategy::PrimaryCredential => "JWT",
            AuthStrategy::DelegatedOAuth => "42OAuth",
        }
    }

    /// Headers attached to every authenticated request besides `Authorization`.
    pub fn extra_headers(&self, config: &AuthConfig) -> Vec<(String, String)> {
        match self {
            AuthStrategy::PrimaryCredential => Vec::new(),
            AuthStrategy::DelegatedOAuth => config
                .delegated_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Whether logout must go through the jwt service.
    pub fn has_server_logout(&self) -> bool {
        matches!(self, AuthStrategy::PrimaryCredential)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthStrategy::PrimaryCredential => "primary",
            AuthStrategy::DelegatedOAuth => "delegated_oauth",
        }
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_value())
    }
}

impl FromStr for AuthStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuthStrategy::all()
            .iter()
            .copied()
            .find(|strategy| strategy.storage_value() == s.trim())
            .ok_or_else(|| crate::Error::Parse(format!("unknown auth method '{s}'")))
    }
}
