//! Epoch resolution with a process-lifetime cache.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::store::DatasetStore;

/// Resolves the ordered epoch list of a dataset, caching results for the
/// life of the process.
///
/// The cache is keyed by the registered dataset names fixed at startup;
/// names outside that set resolve to an empty list without touching the
/// store. A non-empty cached list is never refreshed. An empty store
/// result is also written to the cache but is indistinguishable from
/// "not yet loaded", so such datasets are re-queried on every call — no
/// negative caching.
///
/// Construct once and share via `Arc`; interior locking keeps `resolve`
/// callable from concurrent handlers. The lock is never held across a
/// store call, so concurrent cold lookups may issue duplicate metadata
/// queries; both write the same value.
pub struct EpochResolver {
    cache: RwLock<HashMap<String, Vec<String>>>,
}

impl EpochResolver {
    pub fn new(registered: &[String]) -> Self {
        let cache = registered
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();
        Self {
            cache: RwLock::new(cache),
        }
    }

    /// Epochs of `dataset`, newest first.
    ///
    /// Returns an empty list for unregistered datasets and on store
    /// failure; the failure is logged, not propagated. Callers must treat
    /// empty as "no record for this dataset".
    pub async fn resolve(&self, store: &dyn DatasetStore, dataset: &str) -> Vec<String> {
        {
            let cache = self.cache.read().unwrap();
            match cache.get(dataset) {
                None => return Vec::new(),
                Some(epochs) if !epochs.is_empty() => return epochs.clone(),
                Some(_) => {}
            }
        }

        let epochs = match store.epoch_list(dataset).await {
            Ok(epochs) => epochs,
            Err(error) => {
                tracing::warn!(dataset, %error, "epoch resolution failed");
                return Vec::new();
            }
        };

        self.cache
            .write()
            .unwrap()
            .insert(dataset.to_string(), epochs.clone());
        epochs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::{DecisionCount, EditDayCount, LeaderboardEntry};
    use crate::query::SearchQuery;
    use crate::store::Row;

    /// Store stub that counts epoch lookups and can be switched to fail.
    struct CountingStore {
        epochs: Vec<String>,
        fail: bool,
        lookups: AtomicUsize,
    }

    impl CountingStore {
        fn with_epochs(epochs: &[&str]) -> Self {
            Self {
                epochs: epochs.iter().map(|s| s.to_string()).collect(),
                fail: false,
                lookups: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                epochs: Vec::new(),
                fail: true,
                lookups: AtomicUsize::new(0),
            }
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DatasetStore for CountingStore {
        async fn dataset_names(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn epoch_list(&self, _dataset: &str) -> Result<Vec<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("connection refused");
            }
            Ok(self.epochs.clone())
        }

        async fn dump_rows(&self, _dataset: &str, _epoch: &str) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn latest_stats(&self, _dataset: &str, _epoch: &str) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn edits_by_day(&self, _dataset: &str, _epoch: &str) -> Result<Vec<EditDayCount>> {
            Ok(Vec::new())
        }

        async fn decision_counts(
            &self,
            _dataset: &str,
            _epoch: &str,
        ) -> Result<Vec<DecisionCount>> {
            Ok(Vec::new())
        }

        async fn leaderboard(&self, _dataset: &str, _epoch: &str) -> Result<Vec<LeaderboardEntry>> {
            Ok(Vec::new())
        }

        async fn search_rows(&self, _query: &SearchQuery) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    fn registered(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unregistered_dataset_resolves_empty_without_store_access() {
        let resolver = EpochResolver::new(&registered(&["foo"]));
        let store = CountingStore::with_epochs(&["3", "2", "1"]);

        assert!(resolver.resolve(&store, "bar").await.is_empty());
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn test_populate_once_then_serve_from_cache() {
        let resolver = EpochResolver::new(&registered(&["foo"]));
        let store = CountingStore::with_epochs(&["3", "2", "1"]);

        let first = resolver.resolve(&store, "foo").await;
        let second = resolver.resolve(&store, "foo").await;

        assert_eq!(first, vec!["3", "2", "1"]);
        assert_eq!(first, second);
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_requeried() {
        let resolver = EpochResolver::new(&registered(&["foo"]));
        let store = CountingStore::with_epochs(&[]);

        assert!(resolver.resolve(&store, "foo").await.is_empty());
        assert!(resolver.resolve(&store, "foo").await.is_empty());
        assert_eq!(store.lookups(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed_as_empty() {
        let resolver = EpochResolver::new(&registered(&["foo"]));
        let store = CountingStore::failing();

        assert!(resolver.resolve(&store, "foo").await.is_empty());
        // Failure did not poison the cache entry; the next call retries.
        assert!(resolver.resolve(&store, "foo").await.is_empty());
        assert_eq!(store.lookups(), 2);
    }
}
