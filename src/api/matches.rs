use super::{Api, MATCHES_KEY, MatchRecord, SharedState, unexpected_cache_value};
use crate::Result;
use crate::cache::EntryStatus;
use crate::client::ApiRequest;

impl Api {
    /// GET the match history, bypassing the cache.
    pub async fn fetch_match_history(&self) -> Result<Vec<MatchRecord>> {
        let url = self.endpoints().match_history_url();
        let response = self.gateway.call(ApiRequest::get(url)).await?;
        Ok(response.json().await?)
    }

    /// Match history from the cache, populating it on first use.
    pub async fn match_history(&self) -> Result<Vec<MatchRecord>> {
        let api = self.clone();
        let state = self
            .cache
            .initialize(MATCHES_KEY, move || async move {
                api.fetch_match_history()
                    .await
                    .map(SharedState::MatchHistory)
            })
            .await?;
        state
            .into_match_history()
            .ok_or_else(|| unexpected_cache_value(MATCHES_KEY))
    }

    pub async fn refresh_match_history(&self) -> Result<Vec<MatchRecord>> {
        self.cache.invalidate(MATCHES_KEY);
        self.match_history().await
    }

    pub fn match_history_snapshot(&self) -> Option<Vec<MatchRecord>> {
        self.cache
            .get(MATCHES_KEY)
            .and_then(SharedState::into_match_history)
    }

    pub fn match_history_status(&self) -> EntryStatus {
        self.cache.status(MATCHES_KEY)
    }
}
