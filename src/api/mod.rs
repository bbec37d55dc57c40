//! Domain calls against the friends, game and mfa services.
//!
//! Every call goes through the [`Gateway`](crate::client::Gateway). Lists
//! that several views read are kept in the session [`Cache`] under
//! [`FRIENDS_KEY`] and [`MATCHES_KEY`].

mod account;
mod friends;
mod matches;
mod types;
mod validate;

pub use types::{
    FRIENDS_KEY, Friend, FriendStatus, MATCHES_KEY, MatchRecord, Presence, SharedState,
};
pub use validate::{MAX_INPUT_LEN, validate_input};

use std::sync::Arc;

use crate::Error;
use crate::cache::Cache;
use crate::client::Gateway;
use crate::config::Endpoints;
use crate::storage::ProfileStore;

/// Cloneable handle for domain calls. Shares the gateway and cache of the
/// session it came from.
#[derive(Clone, Debug)]
pub struct Api {
    gateway: Arc<Gateway>,
    cache: Cache<SharedState>,
}

impl Api {
    pub fn new(gateway: Arc<Gateway>, cache: Cache<SharedState>) -> Self {
        Self { gateway, cache }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn cache(&self) -> &Cache<SharedState> {
        &self.cache
    }

    fn endpoints(&self) -> &Endpoints {
        self.gateway.credentials().endpoints()
    }

    fn profile(&self) -> &ProfileStore {
        self.gateway.credentials().profile()
    }
}

fn unexpected_cache_value(key: &str) -> Error {
    Error::Parse(format!("cache key '{}' holds a value of another type", key))
}
