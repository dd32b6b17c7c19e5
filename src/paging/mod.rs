//! Random access over a paged remote search.
//!
//! `PagedResultCache` answers "give me result `i`" for a query whose results
//! are only reachable a page at a time. Pages are fetched on demand at
//! aligned offsets, shared between concurrent lookups while in flight, and
//! kept in a bounded LRU set. The total result count comes from the first
//! page, which doubles as a cache-warming fetch.
//!
//! ```ignore
//! let cache = PagedResultCache::new(CorporatePages::new(client, options), 30, 100);
//! let total = cache.count().await?;
//! let first = cache.get(0).await?;
//! // view torn down or query changed
//! cache.cancel_all();
//! ```

mod chunk;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use color_eyre::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chunk::{Chunk, ChunkIndex};

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u64 = 30;

/// Number of pages kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 100;

/// One page of results together with the query's total result count.
#[derive(Debug, Clone)]
pub struct Page<R> {
  pub records: Vec<R>,
  pub total: u64,
}

/// A remote search that can be read one page at a time.
pub trait PageSource: Send + Sync + 'static {
  type Record: Clone + Send + Sync + 'static;

  /// Fetch up to `limit` records starting at logical index `offset`.
  fn fetch_page(&self, offset: u64, limit: u64) -> BoxFuture<'static, Result<Page<Self::Record>>>;
}

/// Why a lookup produced no record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
  /// Resolving the total count failed. Retrying issues a fresh fetch.
  #[error("failed to fetch results at offset {offset}: {message}")]
  Fetch { offset: u64, message: String },
  /// The page holding the record failed to load.
  #[error("result page is unavailable")]
  Unavailable,
  /// `cancel_all` was called before the lookup resolved.
  #[error("lookup was canceled")]
  Canceled,
}

type PageHandle<R> = Shared<BoxFuture<'static, Result<Arc<Page<R>>, PageError>>>;

enum CountState<R> {
  Unknown,
  Pending { attempt: u64, handle: PageHandle<R> },
  Known(u64),
}

struct CacheState<R> {
  chunks: ChunkIndex<PageHandle<R>>,
  count: CountState<R>,
  count_attempts: u64,
  next_id: u64,
}

struct Inner<S: PageSource> {
  source: Arc<S>,
  page_size: u64,
  state: Mutex<CacheState<S::Record>>,
  token: CancellationToken,
  fetches: AtomicU64,
}

/// Lazily fetched, LRU-bounded random access to a query's results.
///
/// Clones share the same pages, count and cancellation state.
pub struct PagedResultCache<S: PageSource> {
  inner: Arc<Inner<S>>,
}

impl<S: PageSource> Clone for PagedResultCache<S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<S: PageSource> PagedResultCache<S> {
  /// Create a cache over `source` fetching `page_size` records per request
  /// and keeping at most `capacity` pages.
  pub fn new(source: S, page_size: u64, capacity: usize) -> Self {
    Self {
      inner: Arc::new(Inner {
        source: Arc::new(source),
        page_size: page_size.max(1),
        state: Mutex::new(CacheState {
          chunks: ChunkIndex::new(capacity),
          count: CountState::Unknown,
          count_attempts: 0,
          next_id: 0,
        }),
        token: CancellationToken::new(),
        fetches: AtomicU64::new(0),
      }),
    }
  }

  /// Total number of results for the query.
  ///
  /// The first call fetches the page at offset 0 and keeps it cached. A
  /// failed first fetch is not remembered: the next call tries again.
  pub async fn count(&self) -> Result<u64, PageError> {
    if self.is_canceled() {
      return Err(PageError::Canceled);
    }

    let (attempt, handle) = {
      let mut state = self.inner.lock();
      let pending = match &state.count {
        CountState::Known(total) => return Ok(*total),
        CountState::Pending { attempt, handle } => Some((*attempt, handle.clone())),
        CountState::Unknown => None,
      };
      match pending {
        Some(pending) => pending,
        None => {
          let handle = self.inner.first_page(&mut state);
          state.count_attempts += 1;
          let attempt = state.count_attempts;
          state.count = CountState::Pending {
            attempt,
            handle: handle.clone(),
          };
          (attempt, handle)
        }
      }
    };

    let outcome = self.cancelable(handle).await;

    let mut state = self.inner.lock();
    let current = matches!(&state.count, CountState::Pending { attempt: a, .. } if *a == attempt);
    match outcome {
      Ok(page) => {
        if current {
          debug!(total = page.total, "resolved result count");
          state.count = CountState::Known(page.total);
        }
        Ok(page.total)
      }
      Err(PageError::Canceled) => Err(PageError::Canceled),
      Err(e) => {
        if current {
          state.count = CountState::Unknown;
        }
        Err(e)
      }
    }
  }

  /// The record at logical `index`, or `None` outside `[0, count())`.
  pub async fn get(&self, index: i64) -> Result<Option<S::Record>, PageError> {
    let total = self.count().await?;
    let index = match u64::try_from(index) {
      Ok(i) if i < total => i,
      _ => return Ok(None),
    };

    let (offset, handle) = self.inner.chunk_for(index);

    match self.cancelable(handle).await {
      Ok(page) => Ok(usize::try_from(index - offset)
        .ok()
        .and_then(|i| page.records.get(i))
        .cloned()),
      Err(PageError::Canceled) => Err(PageError::Canceled),
      Err(_) => Err(PageError::Unavailable),
    }
  }

  /// Stop delivering results. Lookups still pending resolve to
  /// `PageError::Canceled`; later calls fail the same way.
  pub fn cancel_all(&self) {
    if !self.inner.token.is_cancelled() {
      debug!("canceling pending result lookups");
      self.inner.token.cancel();
    }
  }

  pub fn is_canceled(&self) -> bool {
    self.inner.token.is_cancelled()
  }

  /// Offsets of the pages currently cached, ascending.
  pub fn cached_offsets(&self) -> Vec<u64> {
    self.inner.lock().chunks.offsets()
  }

  /// Number of page fetches started over the cache's lifetime.
  pub fn fetches_started(&self) -> u64 {
    self.inner.fetches.load(Ordering::Relaxed)
  }

  async fn cancelable<T>(
    &self,
    fut: impl Future<Output = Result<T, PageError>>,
  ) -> Result<T, PageError> {
    tokio::select! {
      biased;
      _ = self.inner.token.cancelled() => Err(PageError::Canceled),
      result = fut => result,
    }
  }
}

impl<S: PageSource> Inner<S> {
  fn lock(&self) -> MutexGuard<'_, CacheState<S::Record>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Handle for the page at offset 0, fetching it if nothing covers index 0.
  fn first_page(self: &Arc<Self>, state: &mut CacheState<S::Record>) -> PageHandle<S::Record> {
    match state.chunks.lookup(0) {
      Ok(chunk) => chunk.handle.clone(),
      Err(pos) => self.insert_chunk(state, pos, 0),
    }
  }

  /// Offset and handle of the page covering `index`, fetching on a miss.
  ///
  /// Lookup, fetch start and insertion happen under one lock acquisition so
  /// a fetch result can never observe a half-updated chunk set.
  fn chunk_for(self: &Arc<Self>, index: u64) -> (u64, PageHandle<S::Record>) {
    let mut state = self.lock();

    if let Some(chunk) = state.chunks.most_recent() {
      if chunk.covers(index) {
        return (chunk.offset, chunk.handle.clone());
      }
    }

    match state.chunks.lookup(index) {
      Ok(chunk) => (chunk.offset, chunk.handle.clone()),
      Err(pos) => {
        let offset = index / self.page_size * self.page_size;
        (offset, self.insert_chunk(&mut state, pos, offset))
      }
    }
  }

  fn insert_chunk(
    self: &Arc<Self>,
    state: &mut CacheState<S::Record>,
    pos: usize,
    offset: u64,
  ) -> PageHandle<S::Record> {
    let id = state.next_id;
    state.next_id += 1;

    let handle = self.start_fetch(id, offset);
    let evicted = state.chunks.insert(
      pos,
      Chunk {
        id,
        offset,
        length: self.page_size,
        handle: handle.clone(),
      },
    );
    if let Some(evicted) = evicted {
      debug!(offset = evicted.offset, "evicted result page");
    }
    handle
  }

  /// Spawn the fetch for one page. A failed fetch removes its own chunk so
  /// the next lookup in that range fetches again.
  fn start_fetch(self: &Arc<Self>, id: u64, offset: u64) -> PageHandle<S::Record> {
    self.fetches.fetch_add(1, Ordering::Relaxed);
    let limit = self.page_size;
    let request = self.source.fetch_page(offset, limit);
    let owner = Arc::downgrade(self);

    debug!(offset, limit, "fetching result page");
    let task = tokio::spawn(async move {
      match request.await {
        Ok(page) => Ok(Arc::new(page)),
        Err(e) => {
          warn!(offset, error = %e, "result page fetch failed");
          if let Some(owner) = owner.upgrade() {
            owner.lock().chunks.purge(id);
          }
          Err(PageError::Fetch {
            offset,
            message: e.to_string(),
          })
        }
      }
    });

    async move {
      match task.await {
        Ok(result) => result,
        Err(e) => Err(PageError::Fetch {
          offset,
          message: e.to_string(),
        }),
      }
    }
    .boxed()
    .shared()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use color_eyre::eyre::eyre;
  use std::collections::HashSet;
  use tokio::sync::Semaphore;

  #[derive(Default)]
  struct Script {
    total: u64,
    requested: Mutex<Vec<u64>>,
    failing: Mutex<HashSet<u64>>,
    gate: Option<Semaphore>,
  }

  /// In-memory source whose record at index `i` is `i`.
  #[derive(Clone)]
  struct ScriptedSource(Arc<Script>);

  impl ScriptedSource {
    fn new(total: u64) -> Self {
      Self(Arc::new(Script {
        total,
        ..Default::default()
      }))
    }

    /// Fetches wait until `release` hands out permits.
    fn gated(total: u64) -> Self {
      Self(Arc::new(Script {
        total,
        gate: Some(Semaphore::new(0)),
        ..Default::default()
      }))
    }

    fn release(&self, fetches: usize) {
      if let Some(gate) = &self.0.gate {
        gate.add_permits(fetches);
      }
    }

    fn fail_at(&self, offset: u64) {
      self.0.failing.lock().unwrap().insert(offset);
    }

    fn recover(&self, offset: u64) {
      self.0.failing.lock().unwrap().remove(&offset);
    }

    fn requested(&self) -> Vec<u64> {
      self.0.requested.lock().unwrap().clone()
    }
  }

  impl PageSource for ScriptedSource {
    type Record = u64;

    fn fetch_page(&self, offset: u64, limit: u64) -> BoxFuture<'static, Result<Page<u64>>> {
      let script = Arc::clone(&self.0);
      async move {
        script.requested.lock().unwrap().push(offset);
        if let Some(gate) = &script.gate {
          gate.acquire().await?.forget();
        }
        if script.failing.lock().unwrap().contains(&offset) {
          return Err(eyre!("connection reset"));
        }
        let end = (offset + limit).min(script.total);
        Ok(Page {
          records: (offset..end).collect(),
          total: script.total,
        })
      }
      .boxed()
    }
  }

  #[tokio::test]
  async fn test_count_fetches_first_page_once() {
    let source = ScriptedSource::new(95);
    let cache = PagedResultCache::new(source.clone(), 30, 10);

    assert_eq!(cache.count().await, Ok(95));
    assert_eq!(cache.count().await, Ok(95));
    assert_eq!(source.requested(), vec![0]);
    assert_eq!(cache.cached_offsets(), vec![0]);

    // The count probe warmed the cache for the first page
    assert_eq!(cache.get(29).await, Ok(Some(29)));
    assert_eq!(source.requested(), vec![0]);
  }

  #[tokio::test]
  async fn test_get_matches_aligned_page() {
    let source = ScriptedSource::new(95);
    let cache = PagedResultCache::new(source.clone(), 30, 10);

    for i in [0, 31, 59, 60, 94, 45, 3] {
      assert_eq!(cache.get(i).await, Ok(Some(i as u64)));
    }
    assert_eq!(source.requested(), vec![0, 30, 60, 90]);
    assert_eq!(cache.cached_offsets(), vec![0, 30, 60, 90]);
  }

  #[tokio::test]
  async fn test_out_of_range_is_none() {
    let source = ScriptedSource::new(100);
    let cache = PagedResultCache::new(source.clone(), 30, 10);

    assert_eq!(cache.get(-1).await, Ok(None));
    assert_eq!(cache.get(100).await, Ok(None));
    assert_eq!(cache.get(i64::MAX).await, Ok(None));
    assert_eq!(cache.get(99).await, Ok(Some(99)));
    assert_eq!(source.requested(), vec![0, 90]);
  }

  #[tokio::test]
  async fn test_empty_result_set() {
    let source = ScriptedSource::new(0);
    let cache = PagedResultCache::new(source.clone(), 30, 10);

    assert_eq!(cache.count().await, Ok(0));
    assert_eq!(cache.get(0).await, Ok(None));
  }

  #[tokio::test]
  async fn test_eviction_refetches_least_recent_page() {
    let source = ScriptedSource::new(1000);
    let cache = PagedResultCache::new(source.clone(), 30, 2);

    assert_eq!(cache.get(0).await, Ok(Some(0)));
    assert_eq!(cache.get(35).await, Ok(Some(35)));
    assert_eq!(cache.get(65).await, Ok(Some(65)));
    assert_eq!(cache.cached_offsets(), vec![30, 60]);

    assert_eq!(cache.get(5).await, Ok(Some(5)));
    assert_eq!(source.requested(), vec![0, 30, 60, 0]);
    assert_eq!(cache.cached_offsets(), vec![0, 60]);
  }

  #[tokio::test]
  async fn test_access_refreshes_recency() {
    let source = ScriptedSource::new(1000);
    let cache = PagedResultCache::new(source.clone(), 30, 2);

    cache.get(0).await.unwrap();
    cache.get(35).await.unwrap();
    // Page 0 is used again, so page 30 becomes the eviction victim
    cache.get(5).await.unwrap();
    cache.get(65).await.unwrap();

    assert_eq!(cache.cached_offsets(), vec![0, 60]);
    assert_eq!(source.requested(), vec![0, 30, 60]);
  }

  #[tokio::test]
  async fn test_concurrent_lookups_share_one_fetch() {
    let source = ScriptedSource::gated(1000);
    let cache = PagedResultCache::new(source.clone(), 30, 10);

    let (count, _) = tokio::join!(cache.count(), async {
      tokio::task::yield_now().await;
      source.release(1);
    });
    assert_eq!(count, Ok(1000));

    let (a, b, c, _) = tokio::join!(cache.get(40), cache.get(45), cache.get(59), async {
      tokio::task::yield_now().await;
      assert_eq!(cache.fetches_started(), 2);
      source.release(10);
    });

    assert_eq!(a, Ok(Some(40)));
    assert_eq!(b, Ok(Some(45)));
    assert_eq!(c, Ok(Some(59)));
    assert_eq!(source.requested(), vec![0, 30]);
  }

  #[tokio::test]
  async fn test_cancel_all_drops_pending_lookups() {
    let source = ScriptedSource::gated(1000);
    let cache = PagedResultCache::new(source.clone(), 30, 10);
    source.release(1);
    assert_eq!(cache.get(1).await, Ok(Some(1)));

    let (pending, _) = tokio::join!(cache.get(40), async {
      tokio::task::yield_now().await;
      cache.cancel_all();
      source.release(10);
    });

    assert_eq!(pending, Err(PageError::Canceled));
    assert!(cache.is_canceled());
    assert_eq!(cache.get(1).await, Err(PageError::Canceled));
    assert_eq!(cache.count().await, Err(PageError::Canceled));
  }

  #[tokio::test]
  async fn test_failed_count_is_retried_with_fresh_fetch() {
    let source = ScriptedSource::new(100);
    source.fail_at(0);
    let cache = PagedResultCache::new(source.clone(), 30, 10);

    let err = cache.count().await.unwrap_err();
    assert!(matches!(err, PageError::Fetch { offset: 0, .. }));
    assert!(cache.cached_offsets().is_empty());

    source.recover(0);
    assert_eq!(cache.get(0).await, Ok(Some(0)));
    assert_eq!(source.requested(), vec![0, 0]);
    assert_eq!(cache.count().await, Ok(100));
  }

  #[tokio::test]
  async fn test_failed_page_is_purged_and_refetched() {
    let source = ScriptedSource::new(100);
    source.fail_at(30);
    let cache = PagedResultCache::new(source.clone(), 30, 10);

    assert_eq!(cache.get(35).await, Err(PageError::Unavailable));
    assert_eq!(cache.cached_offsets(), vec![0]);
    // Other pages are unaffected
    assert_eq!(cache.get(2).await, Ok(Some(2)));
    assert_eq!(cache.count().await, Ok(100));

    source.recover(30);
    assert_eq!(cache.get(35).await, Ok(Some(35)));
    assert_eq!(source.requested(), vec![0, 30, 30]);
    assert_eq!(cache.cached_offsets(), vec![0, 30]);
  }

  #[tokio::test]
  async fn test_every_waiter_on_failed_page_sees_unavailable() {
    let source = ScriptedSource::new(100);
    source.fail_at(30);
    let cache = PagedResultCache::new(source.clone(), 30, 10);

    let (a, b) = tokio::join!(cache.get(31), cache.get(40));
    assert_eq!(a, Err(PageError::Unavailable));
    assert_eq!(b, Err(PageError::Unavailable));
    // Both lookups shared the one request for offset 30
    assert_eq!(source.requested(), vec![0, 30]);
    assert_eq!(cache.cached_offsets(), vec![0]);
  }
}
