//! Service endpoint configuration.

use std::env;

use url::Url;

use crate::auth::AuthStrategy;
use crate::{Error, Result};

/// Default origin used when no environment override is present.
pub const DEFAULT_ORIGIN: &str = "https://localhost";

/// Public service that hands out a random picture for users without one.
pub const DEFAULT_AVATAR_URL: &str = "https://dog.ceo/api/breeds/image/random";

const JWT_ENV: &str = "PONG_JWT_API_URL";
const OAUTH_JWT_ENV: &str = "PONG_OAUTH_JWT_API_URL";
const FRIENDS_ENV: &str = "PONG_FRIENDS_API_URL";
const GAME_ENV: &str = "PONG_GAME_API_URL";
const MFA_ENV: &str = "PONG_MFA_API_URL";
const AVATAR_ENV: &str = "PONG_AVATAR_API_URL";
const ORIGIN_ENV: &str = "PONG_API_ORIGIN";

/// Base URLs of the backend services.
///
/// Every base is stored without a trailing slash; the derived URLs
/// always end with one, matching the routes of the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub jwt: String,
    pub oauth_jwt: String,
    pub friends: String,
    pub game: String,
    pub mfa: String,
    /// Full URL of the random picture service, not a base.
    pub avatar: String,
}

impl Endpoints {
    /// Endpoints laid out under a single origin, as served by the reverse proxy.
    pub fn local(origin: &str) -> Self {
        let origin = trim_base(origin);
        Self {
            jwt: format!("{origin}/api/jwt"),
            oauth_jwt: format!("{origin}/api/oauth/jwt"),
            friends: format!("{origin}/api/friends"),
            game: format!("{origin}/api/game"),
            mfa: format!("{origin}/api/mfa"),
            avatar: DEFAULT_AVATAR_URL.to_string(),
        }
    }

    /// Create from environment variables, falling back to [`Endpoints::local`].
    pub fn from_env() -> Result<Self> {
        let origin = env::var(ORIGIN_ENV).unwrap_or_else(|_| DEFAULT_ORIGIN.to_string());
        let defaults = Self::local(&origin);

        let endpoints = Self {
            jwt: env_or(JWT_ENV, defaults.jwt),
            oauth_jwt: env_or(OAUTH_JWT_ENV, defaults.oauth_jwt),
            friends: env_or(FRIENDS_ENV, defaults.friends),
            game: env_or(GAME_ENV, defaults.game),
            mfa: env_or(MFA_ENV, defaults.mfa),
            avatar: env_or(AVATAR_ENV, defaults.avatar),
        };
        endpoints.validate()?;
        Ok(endpoints)
    }

    pub fn builder(origin: &str) -> EndpointsBuilder {
        EndpointsBuilder {
            endpoints: Self::local(origin),
        }
    }

    /// Check that every base is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        for (name, base) in [
            ("jwt", &self.jwt),
            ("oauth_jwt", &self.oauth_jwt),
            ("friends", &self.friends),
            ("game", &self.game),
            ("mfa", &self.mfa),
            ("avatar", &self.avatar),
        ] {
            let url = Url::parse(base)
                .map_err(|e| Error::Config(format!("invalid {name} endpoint '{base}': {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "{name} endpoint must use http or https, got '{}'",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }

    /// Refresh endpoint for the given strategy.
    pub fn refresh_url(&self, strategy: AuthStrategy) -> String {
        match strategy {
            AuthStrategy::PrimaryCredential => format!("{}/refresh/", self.jwt),
            AuthStrategy::DelegatedOAuth => format!("{}/refresh/", self.oauth_jwt),
        }
    }

    pub fn logout_url(&self) -> String {
        format!("{}/logout/", self.jwt)
    }

    pub fn friends_url(&self, route: FriendsRoute) -> String {
        format!("{}/{}/", self.friends, route.path())
    }

    pub fn match_history_url(&self) -> String {
        format!("{}/match-history/", self.game)
    }

    pub fn mfa_enable_url(&self) -> String {
        format!("{}/enable/", self.mfa)
    }

    pub fn mfa_disable_url(&self) -> String {
        format!("{}/disable/", self.mfa)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::local(DEFAULT_ORIGIN)
    }
}

/// Routes of the friends service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FriendsRoute {
    List,
    Add,
    Remove,
    Accept,
    Decline,
    UpdateStatus,
}

impl FriendsRoute {
    fn path(self) -> &'static str {
        match self {
            FriendsRoute::List => "list",
            FriendsRoute::Add => "add",
            FriendsRoute::Remove => "remove",
            FriendsRoute::Accept => "accept",
            FriendsRoute::Decline => "decline",
            FriendsRoute::UpdateStatus => "update_status",
        }
    }
}

/// Builder for [`Endpoints`].
pub struct EndpointsBuilder {
    endpoints: Endpoints,
}

impl EndpointsBuilder {
    pub fn jwt(mut self, base: &str) -> Self {
        self.endpoints.jwt = trim_base(base).to_string();
        self
    }

    pub fn oauth_jwt(mut self, base: &str) -> Self {
        self.endpoints.oauth_jwt = trim_base(base).to_string();
        self
    }

    pub fn friends(mut self, base: &str) -> Self {
        self.endpoints.friends = trim_base(base).to_string();
        self
    }

    pub fn game(mut self, base: &str) -> Self {
        self.endpoints.game = trim_base(base).to_string();
        self
    }

    pub fn mfa(mut self, base: &str) -> Self {
        self.endpoints.mfa = trim_base(base).to_string();
        self
    }

    pub fn avatar(mut self, url: &str) -> Self {
        self.endpoints.avatar = trim_base(url).to_string();
        self
    }

    pub fn build(self) -> Result<Endpoints> {
        self.endpoints.validate()?;
        Ok(self.endpoints)
    }
}

fn trim_base(base: &str) -> &str {
    base.trim().trim_end_matches('/')
}

fn env_or(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .map(|v| trim_base(&v).to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_layout() {
        let endpoints = Endpoints::local("http://localhost:8443/");
        assert_eq!(endpoints.jwt, "http://localhost:8443/api/jwt");
        assert_eq!(
            endpoints.friends_url(FriendsRoute::List),
            "http://localhost:8443/api/friends/list/"
        );
        assert_eq!(
            endpoints.friends_url(FriendsRoute::UpdateStatus),
            "http://localhost:8443/api/friends/update_status/"
        );
        assert_eq!(
            endpoints.match_history_url(),
            "http://localhost:8443/api/game/match-history/"
        );
    }

    #[test]
    fn test_refresh_url_per_strategy() {
        let endpoints = Endpoints::local("http://host");
        assert_eq!(
            endpoints.refresh_url(AuthStrategy::PrimaryCredential),
            "http://host/api/jwt/refresh/"
        );
        assert_eq!(
            endpoints.refresh_url(AuthStrategy::DelegatedOAuth),
            "http://host/api/oauth/jwt/refresh/"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let endpoints = Endpoints::builder("http://host")
            .friends("http://friends.internal:9000/")
            .build()
            .unwrap();
        assert_eq!(endpoints.friends, "http://friends.internal:9000");
        assert_eq!(endpoints.game, "http://host/api/game");
        assert_eq!(endpoints.avatar, DEFAULT_AVATAR_URL);
    }

    #[test]
    fn test_builder_rejects_invalid_url() {
        let result = Endpoints::builder("http://host").mfa("not a url").build();
        assert!(matches!(result, Err(Error::Config(_))));

        let result = Endpoints::builder("http://host").game("ftp://host/game").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
