//! Async loader for values a view shows while they are being fetched.
//!
//! A `Query<T>` owns one background task at a time. Views start it from key
//! handlers, poll it from `tick`, and render from its state. Starting a new
//! fetch or dropping the query aborts the task that is still running, so a
//! slow answer to an old input never overwrites a newer one.
//!
//! # Example
//!
//! ```ignore
//! let client = kenall.clone();
//! let mut query = Query::new(move || {
//!     let client = client.clone();
//!     async move {
//!         client
//!             .search_addresses("横浜市港北区", Some(20))
//!             .await
//!             .map_err(|e| e.to_string())
//!     }
//! });
//!
//! query.fetch();
//!
//! // In tick
//! if query.poll() {
//!     // State changed, re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

struct Pending<T> {
  receiver: mpsc::UnboundedReceiver<Result<T, String>>,
  task: JoinHandle<()>,
}

/// Async query with loading/success/error state.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  pending: Option<Pending<T>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a query from a closure producing the fetch future. The closure
  /// runs again on every `fetch`/`refetch`.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      pending: None,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Start fetching unless a fetch is already running.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Abort whatever is running and fetch again.
  pub fn refetch(&mut self) {
    self.abort();
    self.start_fetch();
  }

  /// Pick up the result of a running fetch.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let pending = match &mut self.pending {
      Some(pending) => pending,
      None => return false,
    };

    match pending.receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.pending = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.pending = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.pending = None;
        true
      }
    }
  }

  fn abort(&mut self) {
    if let Some(pending) = self.pending.take() {
      pending.task.abort();
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    let task = tokio::spawn(async move {
      let result = future.await;
      // Receiver may have been dropped
      let _ = tx.send(result);
    });
    self.pending = Some(Pending { receiver: rx, task });
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if let Some(pending) = self.pending.take() {
      pending.task.abort();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("pending", &self.pending.is_some())
      .finish_non_exhaustive()
  }
}
