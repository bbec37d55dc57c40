use reqwest::StatusCode;
use serde_json::json;
use tokio::task::JoinHandle;

use super::{Api, FRIENDS_KEY, Friend, SharedState, unexpected_cache_value, validate_input};
use crate::Result;
use crate::cache::EntryStatus;
use crate::client::ApiRequest;
use crate::config::FriendsRoute;

impl Api {
    /// GET the friends list, bypassing the cache.
    pub async fn fetch_friends(&self) -> Result<Vec<Friend>> {
        let url = self.endpoints().friends_url(FriendsRoute::List);
        let response = self.gateway.call(ApiRequest::get(url)).await?;
        Ok(response.json().await?)
    }

    /// Friends list from the cache, populating it on first use.
    pub async fn friends(&self) -> Result<Vec<Friend>> {
        let api = self.clone();
        let state = self
            .cache
            .initialize(FRIENDS_KEY, move || async move {
                api.fetch_friends().await.map(SharedState::Friends)
            })
            .await?;
        state
            .into_friends()
            .ok_or_else(|| unexpected_cache_value(FRIENDS_KEY))
    }

    /// Drop the cached list and fetch it again. A failed fetch leaves the
    /// entry failed rather than serving the previous list.
    pub async fn refresh_friends(&self) -> Result<Vec<Friend>> {
        self.cache.invalidate(FRIENDS_KEY);
        self.friends().await
    }

    pub fn friends_snapshot(&self) -> Option<Vec<Friend>> {
        self.cache
            .get(FRIENDS_KEY)
            .and_then(SharedState::into_friends)
    }

    pub fn friends_status(&self) -> EntryStatus {
        self.cache.status(FRIENDS_KEY)
    }

    /// Send a friend request, then reload the list.
    pub async fn add_friend(&self, username: &str) -> Result<Vec<Friend>> {
        let username = validate_input(username)?;
        let url = self.endpoints().friends_url(FriendsRoute::Add);
        let request = ApiRequest::post(url).body(json!({ "receiver_username": username }));

        self.gateway.call(request).await?;
        tracing::info!(username = %username, "Friend request sent");
        self.refresh_friends().await
    }

    pub async fn remove_friend(&self, username: &str) -> Result<Vec<Friend>> {
        let url = self.endpoints().friends_url(FriendsRoute::Remove);
        self.mutate_then_refresh(ApiRequest::delete(url), username)
            .await
    }

    pub async fn accept_friend(&self, username: &str) -> Result<Vec<Friend>> {
        let url = self.endpoints().friends_url(FriendsRoute::Accept);
        self.mutate_then_refresh(ApiRequest::post(url), username)
            .await
    }

    pub async fn decline_friend(&self, username: &str) -> Result<Vec<Friend>> {
        let url = self.endpoints().friends_url(FriendsRoute::Decline);
        self.mutate_then_refresh(ApiRequest::post(url), username)
            .await
    }

    // The server may have applied the change even when the call failed, so
    // the list is reloaded either way. The mutation error wins.
    async fn mutate_then_refresh(
        &self,
        request: ApiRequest,
        username: &str,
    ) -> Result<Vec<Friend>> {
        let request = request.body(json!({ "username": username }));
        let route = request.url.clone();

        let outcome = match self.gateway.call(request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_session_ending() => return Err(e),
            Err(e) => {
                tracing::warn!(url = %route, username, error = %e, "Friend update failed");
                Err(e)
            }
        };

        let refreshed = self.refresh_friends().await;
        outcome?;
        refreshed
    }

    /// PUT the online flag for the current user.
    pub async fn set_online_status(&self, online: bool) -> Result<()> {
        let url = self.endpoints().friends_url(FriendsRoute::UpdateStatus);
        self.gateway
            .call(ApiRequest::put(url).body(json!({ "status": online })))
            .await?;
        tracing::debug!(online, "Online status updated");
        Ok(())
    }

    /// Like [`set_online_status`](Self::set_online_status) but runs on the
    /// runtime, so it completes even if the caller is dropped mid-flight.
    pub fn set_online_status_detached(&self, online: bool) -> JoinHandle<Result<StatusCode>> {
        let url = self.endpoints().friends_url(FriendsRoute::UpdateStatus);
        self.gateway
            .spawn_call(ApiRequest::put(url).body(json!({ "status": online })))
    }
}
