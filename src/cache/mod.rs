//! Keyed cache of asynchronously produced values.
//!
//! Each key moves `Absent -> Pending -> Ready | Failed` once per
//! population cycle. Concurrent [`Cache::initialize`] calls for a key
//! share the one in-flight producer. [`Cache::set`] and
//! [`Cache::invalidate`] win over any population still in flight: a
//! producer only settles the entry if it is still the pending cycle that
//! started it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::{Error, Result};

type Fill<V> = Shared<BoxFuture<'static, std::result::Result<V, Arc<Error>>>>;

enum Slot<V> {
    Pending { cycle: u64, fill: Fill<V> },
    Ready(V),
    Failed(Arc<Error>),
}

/// Observable state of one key.
#[derive(Clone, Debug)]
pub enum EntryStatus {
    Absent,
    Pending,
    Ready,
    Failed(Arc<Error>),
}

impl EntryStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, EntryStatus::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, EntryStatus::Failed(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntryStatus::Pending)
    }
}

/// Cloneable handle to a shared cache.
#[derive(Clone)]
pub struct Cache<V> {
    entries: Arc<DashMap<String, Slot<V>>>,
    cycles: Arc<AtomicU64>,
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            cycles: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<V> std::fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate `key` with `producer` unless it is already pending or ready.
    ///
    /// A `Failed` entry counts as absent and is populated again. Every
    /// caller that joined the same cycle observes the same outcome.
    pub async fn initialize<F, Fut>(&self, key: &str, producer: F) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (cycle, fill) = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get() {
                Slot::Ready(value) => return Ok(value.clone()),
                Slot::Pending { cycle, fill } => (*cycle, fill.clone()),
                Slot::Failed(_) => {
                    let (cycle, fill) = self.start(key, producer);
                    occupied.insert(Slot::Pending {
                        cycle,
                        fill: fill.clone(),
                    });
                    (cycle, fill)
                }
            },
            Entry::Vacant(vacant) => {
                let (cycle, fill) = self.start(key, producer);
                vacant.insert(Slot::Pending {
                    cycle,
                    fill: fill.clone(),
                });
                (cycle, fill)
            }
        };

        let outcome = fill.await;
        self.settle(key, cycle, &outcome);
        outcome.map_err(|source| Error::Population {
            key: key.to_string(),
            source,
        })
    }

    // The producer is only invoked on first poll, after the entry lock is released.
    fn start<F, Fut>(&self, key: &str, producer: F) -> (u64, Fill<V>)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(key, cycle, "Populating cache entry");
        let fill = async move { producer().await.map_err(Arc::new) }
            .boxed()
            .shared();
        (cycle, fill)
    }

    fn settle(&self, key: &str, cycle: u64, outcome: &std::result::Result<V, Arc<Error>>) {
        let Some(mut slot) = self.entries.get_mut(key) else {
            return;
        };
        if !matches!(&*slot, Slot::Pending { cycle: c, .. } if *c == cycle) {
            return;
        }
        *slot = match outcome {
            Ok(value) => {
                tracing::debug!(key, cycle, "Cache entry ready");
                Slot::Ready(value.clone())
            }
            Err(error) => {
                tracing::warn!(key, cycle, error = %error, "Cache entry failed");
                Slot::Failed(Arc::clone(error))
            }
        };
    }

    /// The ready value, or `None` while absent, pending or failed.
    pub fn get(&self, key: &str) -> Option<V> {
        match self.entries.get(key).as_deref() {
            Some(Slot::Ready(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn status(&self, key: &str) -> EntryStatus {
        match self.entries.get(key).as_deref() {
            None => EntryStatus::Absent,
            Some(Slot::Pending { .. }) => EntryStatus::Pending,
            Some(Slot::Ready(_)) => EntryStatus::Ready,
            Some(Slot::Failed(error)) => EntryStatus::Failed(Arc::clone(error)),
        }
    }

    /// Force `key` to ready with `value`, superseding any pending population.
    pub fn set(&self, key: &str, value: V) {
        self.entries.insert(key.to_string(), Slot::Ready(value));
    }

    /// Reset `key` to absent. Returns whether an entry existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_producer(
        calls: Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<String>> + Send + 'static {
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(value.to_string())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_initialize_runs_producer_once() {
        let cache: Cache<String> = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let callers =
            (0..8).map(|_| cache.initialize("friends", counting_producer(calls.clone(), "list")));
        let results = futures::future::join_all(callers).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.as_deref().ok() == Some("list")));
        assert_eq!(cache.get("friends").as_deref(), Some("list"));
    }

    #[tokio::test]
    async fn test_ready_entry_skips_producer() {
        let cache: Cache<String> = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.set("matches", "cached".to_string());
        let value = cache
            .initialize("matches", counting_producer(calls.clone(), "fresh"))
            .await
            .unwrap();
        assert_eq!(value, "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_entry_is_retried_on_next_initialize() {
        let cache: Cache<String> = Cache::new();

        let err = cache
            .initialize("friends", || async {
                Err(Error::RequestFailed {
                    status: 500,
                    body: "down".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Population { .. }));
        assert!(cache.status("friends").is_failed());
        assert_eq!(cache.get("friends"), None);

        let calls = Arc::new(AtomicUsize::new(0));
        let value = cache
            .initialize("friends", counting_producer(calls.clone(), "recovered"))
            .await
            .unwrap();
        assert_eq!(value, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.status("friends").is_ready());
    }

    #[tokio::test]
    async fn test_set_during_population_is_not_overwritten() {
        let cache: Cache<String> = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let pending = tokio::spawn({
            let cache = cache.clone();
            let producer = counting_producer(calls.clone(), "stale");
            async move { cache.initialize("friends", producer).await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.status("friends").is_pending());

        cache.set("friends", "fresh".to_string());
        assert_eq!(cache.get("friends").as_deref(), Some("fresh"));

        let stale = pending.await.unwrap().unwrap();
        assert_eq!(stale, "stale");
        assert_eq!(cache.get("friends").as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_invalidate_returns_to_absent() {
        let cache: Cache<u32> = Cache::new();
        cache.set("count", 1);
        assert!(cache.invalidate("count"));
        assert!(matches!(cache.status("count"), EntryStatus::Absent));
        assert!(!cache.invalidate("count"));

        let value = cache.initialize("count", || async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[test]
    fn test_set_then_get() {
        let cache: Cache<Vec<u8>> = Cache::new();
        cache.set("bytes", vec![1, 2, 3]);
        cache.set("bytes", vec![4]);
        assert_eq!(cache.get("bytes"), Some(vec![4]));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
