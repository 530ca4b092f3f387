use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::Mutex;

use super::KeyFetchError;

type PendingFetch = Shared<BoxFuture<'static, Result<Vec<u8>, KeyFetchError>>>;

/// Peer verify keys, keyed by `"{principal}:{key_id}"`.
///
/// Keys are fetched lazily and kept for the life of the process. Concurrent
/// misses on the same key share one fetch. A failed fetch leaves nothing
/// behind, so the next lookup tries again.
///
/// Clones share the same entries.
#[derive(Clone, Default)]
pub struct KeyCache {
    inner: Arc<Mutex<CacheState>>,
}

#[derive(Default)]
struct CacheState {
    keys: HashMap<String, Vec<u8>>,
    pending: HashMap<String, PendingFetch>,
}

fn cache_key(principal: &str, key_id: &str) -> String {
    format!("{principal}:{key_id}")
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a key without fetching it, replacing any earlier entry.
    pub async fn insert(&self, principal: &str, key_id: &str, key: impl Into<Vec<u8>>) {
        let mut state = self.inner.lock().await;
        state.keys.insert(cache_key(principal, key_id), key.into());
    }

    /// Returns the key if it is already cached.
    pub async fn cached(&self, principal: &str, key_id: &str) -> Option<Vec<u8>> {
        let state = self.inner.lock().await;
        state.keys.get(&cache_key(principal, key_id)).cloned()
    }

    /// Returns the key, calling `fetch(principal, key_id)` on a miss.
    ///
    /// The fetch runs on its own task: a caller that gives up waiting does not
    /// cancel it for the others.
    pub async fn get<F, Fut>(&self, principal: &str, key_id: &str, fetch: F) -> Result<Vec<u8>, KeyFetchError>
    where
        F: FnOnce(String, String) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, KeyFetchError>> + Send + 'static,
    {
        let cache_key = cache_key(principal, key_id);

        let pending = {
            let mut state = self.inner.lock().await;
            if let Some(key) = state.keys.get(&cache_key) {
                return Ok(key.clone());
            }

            if let Some(pending) = state.pending.get(&cache_key) {
                trace!(principal, key_id, "waiting on key fetch in flight");
                pending.clone()
            } else {
                debug!(principal, key_id, "fetching verify key");
                let fetching = fetch(principal.to_owned(), key_id.to_owned());
                let inner = self.inner.clone();
                let entry = cache_key.clone();
                let task = tokio::spawn(async move {
                    let result = fetching.await;
                    let mut state = inner.lock().await;
                    state.pending.remove(&entry);
                    if let Ok(key) = &result {
                        state.keys.insert(entry, key.clone());
                    }
                    result
                });

                let pending = async move {
                    task.await.unwrap_or_else(|e| {
                        warn!(error = %e, "key fetch task failed");
                        Err(KeyFetchError::Aborted)
                    })
                }
                .boxed()
                .shared();
                state.pending.insert(cache_key, pending.clone());
                pending
            }
        };

        pending.await
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches2::assert_matches;
    use futures_util::future::join_all;

    use super::*;

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let cache = KeyCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let lookups = (0..8).map(|_| {
            let calls = calls.clone();
            cache.get("s.test", "ed25519:1", move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::task::yield_now().await;
                    Ok::<_, KeyFetchError>(vec![7u8; 32])
                }
            })
        });
        let results = join_all(lookups).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), 8);
        for result in results {
            assert_eq!(result.unwrap(), vec![7; 32]);
        }
        assert_eq!(cache.cached("s.test", "ed25519:1").await, Some(vec![7; 32]));
    }

    #[tokio::test]
    async fn failed_fetch_is_retried() {
        let cache = KeyCache::new();

        let err = cache
            .get("s.test", "ed25519:1", |_, _| async {
                Err::<Vec<u8>, _>(KeyFetchError::Network("connection refused".to_owned()))
            })
            .await
            .unwrap_err();
        assert_matches!(err, KeyFetchError::Network(_));
        assert_eq!(cache.cached("s.test", "ed25519:1").await, None);

        let key = cache
            .get("s.test", "ed25519:1", |_, _| async { Ok::<_, KeyFetchError>(vec![1u8; 32]) })
            .await
            .unwrap();
        assert_eq!(key, vec![1; 32]);
        assert_eq!(cache.cached("s.test", "ed25519:1").await, Some(vec![1; 32]));
    }

    #[tokio::test]
    async fn hit_skips_fetch() {
        let cache = KeyCache::new();
        cache.insert("s.test", "ed25519:1", vec![3u8; 32]).await;

        let key = cache
            .get("s.test", "ed25519:1", |_, _| async { Err::<Vec<u8>, _>(KeyFetchError::Aborted) })
            .await
            .unwrap();
        assert_eq!(key, vec![3; 32]);
    }

    #[tokio::test]
    async fn fetch_gets_principal_and_key_id() {
        let cache = KeyCache::new();
        let key = cache
            .get("s.test", "ed25519:abc", |principal, key_id| async move {
                assert_eq!(principal, "s.test");
                assert_eq!(key_id, "ed25519:abc");
                Ok::<_, KeyFetchError>(b"key".to_vec())
            })
            .await
            .unwrap();
        assert_eq!(key, b"key".to_vec());
        assert_eq!(cache.cached("s.test", "ed25519:1").await, None);
    }
}
