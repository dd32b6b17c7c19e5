//! Corporate search exposed as a page source for the result table.

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};

use super::client::KenallClient;
use super::types::{CorporateInfo, CorporateResults, CorporateSearchOptions};
use crate::paging::{Page, PageSource};

/// One corporate registry query, read a window at a time.
#[derive(Clone)]
pub struct CorporatePages {
  client: KenallClient,
  options: CorporateSearchOptions,
}

impl CorporatePages {
  pub fn new(client: KenallClient, options: CorporateSearchOptions) -> Self {
    Self { client, options }
  }
}

impl PageSource for CorporatePages {
  type Record = CorporateInfo;

  fn fetch_page(&self, offset: u64, limit: u64) -> BoxFuture<'static, Result<Page<CorporateInfo>>> {
    let client = self.client.clone();
    let options = self.options.window(offset, limit);
    async move {
      let results = client.search_corporate_info(&options).await?;
      into_page(offset, results)
    }
    .boxed()
  }
}

/// Records are placed by the offset that was asked for, so a response for
/// another window is rejected.
fn into_page(offset: u64, results: CorporateResults) -> Result<Page<CorporateInfo>> {
  if results.offset != offset {
    return Err(eyre!(
      "Asked for results from {} but got them from {}",
      offset,
      results.offset
    ));
  }
  Ok(Page {
    total: results.count,
    records: results.data,
  })
}
