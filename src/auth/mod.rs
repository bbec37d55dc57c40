//! Access credential management.
//!
//! Two mutually exclusive strategies are supported:
//! - **PrimaryCredential**: username/password login against the jwt service
//! - **DelegatedOAuth**: login delegated to the 42 OAuth provider
//!
//! Either way the access credential is a bearer token that lives only in
//! memory; the long-lived refresh token stays in an HTTP-only cookie.

mod config;
mod credential;
mod store;
mod strategy;

pub use config::{AuthConfig, AuthConfigBuilder, DEFAULT_DELEGATED_HEADER};
pub use credential::Credential;
pub use store::{CredentialSnapshot, CredentialStore};
pub use strategy::AuthStrategy;
