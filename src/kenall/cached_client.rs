//! Cached KEN_ALL client that wraps KenallClient with memoized lookups.

use color_eyre::Result;
use std::sync::Arc;
use tracing::debug;

use crate::cache::CacheLayer;
use crate::config::Config;
use crate::paging::PagedResultCache;

use super::client::KenallClient;
use super::pages::CorporatePages;
use super::types::{Address, AddressSearchOptions, Candidates, CorporateSearchOptions};

/// KEN_ALL client with per-session memoization.
///
/// Postal-code lookups are remembered by code and address searches by
/// query text and limit, each in its own bounded cache. Corporate searches
/// go through a `PagedResultCache` owned by whoever asked for it.
#[derive(Clone)]
pub struct CachedKenallClient {
  inner: KenallClient,
  addresses: Arc<CacheLayer<String, Vec<Address>>>,
  searches: Arc<CacheLayer<(String, Option<u64>), Candidates>>,
}

impl CachedKenallClient {
  pub fn new(config: &Config) -> Result<Self> {
    let inner = KenallClient::new(config)?;
    Ok(Self::with_client(inner, config))
  }

  pub fn with_client(inner: KenallClient, config: &Config) -> Self {
    Self {
      inner,
      addresses: Arc::new(CacheLayer::new(config.lookup.memo_capacity)),
      searches: Arc::new(CacheLayer::new(config.autocomplete.memo_capacity)),
    }
  }

  pub fn client(&self) -> &KenallClient {
    &self.inner
  }

  /// Resolve a canonical postal code, remembering successful answers.
  pub async fn get_address(&self, postal_code: &str) -> Result<Vec<Address>> {
    let result = self
      .addresses
      .fetch(postal_code.to_string(), || {
        let inner = self.inner.clone();
        let postal_code = postal_code.to_string();
        async move { inner.get_address(&postal_code).await }
      })
      .await?;

    debug!(postal_code, source = ?result.source, "address lookup");
    Ok(result.data)
  }

  /// Free-text address search, remembered by query text and limit.
  pub async fn search_addresses(&self, q: &str, limit: Option<u64>) -> Result<Candidates> {
    let result = self
      .searches
      .fetch((q.to_string(), limit), || {
        let inner = self.inner.clone();
        let options = AddressSearchOptions {
          q: q.to_string(),
          offset: None,
          limit,
        };
        async move { inner.search_addresses(&options).await }
      })
      .await?;

    debug!(q, source = ?result.source, "address search");
    Ok(result.data)
  }

  /// Start a paged view over a corporate search.
  pub fn corporate_pages(
    &self,
    options: CorporateSearchOptions,
    page_size: u64,
    capacity: usize,
  ) -> PagedResultCache<CorporatePages> {
    PagedResultCache::new(
      CorporatePages::new(self.inner.clone(), options),
      page_size,
      capacity,
    )
  }
}
