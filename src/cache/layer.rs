//! Cache layer that puts memoization in front of network fetching.

use color_eyre::Result;
use lru::LruCache;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::traits::CacheResult;

/// Cache layer that remembers successful lookups.
///
/// Holds at most `capacity` values; inserting past that drops the entry that
/// was read or written longest ago. The lock is never held across a fetch.
pub struct CacheLayer<K, V> {
  entries: Mutex<LruCache<K, V>>,
}

impl<K, V> CacheLayer<K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  /// A zero capacity is treated as one.
  pub fn new(capacity: usize) -> Self {
    let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
    Self {
      entries: Mutex::new(LruCache::new(capacity)),
    }
  }

  /// Return the remembered value for `key`, or run `fetcher` and remember
  /// its result when it succeeds.
  ///
  /// Two callers missing on the same key at once both fetch; the later
  /// result wins.
  pub async fn fetch<F, Fut>(&self, key: K, fetcher: F) -> Result<CacheResult<V>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V>>,
  {
    if let Some(value) = self.get(&key) {
      return Ok(CacheResult::from_cache(value));
    }

    let value = fetcher().await?;
    self.insert(key, value.clone());
    Ok(CacheResult::from_network(value))
  }

  pub fn get(&self, key: &K) -> Option<V> {
    self.lock().get(key).cloned()
  }

  pub fn insert(&self, key: K, value: V) {
    self.lock().put(key, value);
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.lock().len()
  }

  fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use color_eyre::eyre::eyre;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[tokio::test]
  async fn test_second_fetch_is_memoized() {
    let layer: CacheLayer<String, u32> = CacheLayer::new(4);
    let calls = AtomicUsize::new(0);

    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(7)
    };
    let first = layer.fetch("1000001".to_string(), fetch).await.unwrap();
    let second = layer
      .fetch("1000001".to_string(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(8)
      })
      .await
      .unwrap();

    assert_eq!(first, CacheResult::from_network(7));
    assert_eq!(second.data, 7);
    assert_eq!(second.source, CacheSource::Memory);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_failures_are_not_remembered() {
    let layer: CacheLayer<&str, u32> = CacheLayer::new(4);

    let failed = layer.fetch("k", || async { Err(eyre!("offline")) }).await;
    assert!(failed.is_err());
    assert_eq!(layer.len(), 0);

    let retried = layer.fetch("k", || async { Ok(1) }).await.unwrap();
    assert_eq!(retried.source, CacheSource::Network);
  }

  #[test]
  fn test_least_recently_used_is_dropped() {
    let layer: CacheLayer<u32, u32> = CacheLayer::new(2);
    layer.insert(1, 10);
    layer.insert(2, 20);
    assert_eq!(layer.get(&1), Some(10));

    layer.insert(3, 30);
    assert_eq!(layer.len(), 2);
    assert_eq!(layer.get(&2), None);
    assert_eq!(layer.get(&1), Some(10));
    assert_eq!(layer.get(&3), Some(30));
  }

  #[test]
  fn test_zero_capacity_keeps_one_entry() {
    let layer: CacheLayer<u32, u32> = CacheLayer::new(0);
    layer.insert(1, 1);
    layer.insert(2, 2);
    assert_eq!(layer.len(), 1);
    assert_eq!(layer.get(&1), None);
    assert_eq!(layer.get(&2), Some(2));
  }
}
