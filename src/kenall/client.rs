use crate::config::{ApiConfig, Config};
use crate::kenall::api_types::{
  ApiAddressResolverResponse, ApiAddressSearchResponse, ApiCorporateSearchResponse,
};
use crate::kenall::types::{
  Address, AddressSearchOptions, Candidates, CorporateResults, CorporateSearchOptions,
};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Production API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.kenall.jp/v1";

/// KEN_ALL API client
#[derive(Clone)]
pub struct KenallClient {
  http: reqwest::Client,
  base_url: Url,
}

impl KenallClient {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_api_key()?;
    Self::with_api_key(&config.api, &api_key)
  }

  pub fn with_api_key(api: &ApiConfig, api_key: &str) -> Result<Self> {
    let base_url = parse_base_url(&api.base_url)?;

    let mut auth = HeaderValue::from_str(&format!("Token {}", api_key))
      .map_err(|_| eyre!("KEN_ALL API key contains invalid characters"))?;
    auth.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(Duration::from_millis(api.timeout_ms))
      .user_agent(concat!("kenall-tui/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Resolve a canonical 7-digit postal code to its addresses
  pub async fn get_address(&self, postal_code: &str) -> Result<Vec<Address>> {
    let url = address_url(&self.base_url, postal_code)?;
    let response: ApiAddressResolverResponse = self.get_json(url).await?;
    debug!(postal_code, version = ?response.version, found = response.data.len(), "resolved postal code");
    Ok(response.data)
  }

  /// Free-text address search
  pub async fn search_addresses(&self, options: &AddressSearchOptions) -> Result<Candidates> {
    let url = address_search_url(&self.base_url, options)?;
    let response: ApiAddressSearchResponse = self.get_json(url).await?;
    debug!(
      version = ?response.version,
      count = response.count,
      offset = response.offset,
      limit = response.limit,
      "address search"
    );
    Ok(response.into())
  }

  /// Search the corporate number registry
  pub async fn search_corporate_info(
    &self,
    options: &CorporateSearchOptions,
  ) -> Result<CorporateResults> {
    let url = corporate_search_url(&self.base_url, options)?;
    let response: ApiCorporateSearchResponse = self.get_json(url).await?;
    debug!(
      version = ?response.version,
      count = response.count,
      offset = response.offset,
      limit = response.limit,
      "corporate search"
    );
    Ok(response.into())
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
    debug!(path = url.path(), query = url.query().unwrap_or(""), "KEN_ALL request");

    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url.path(), e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!(
        "KEN_ALL API returned {} for {}: {}",
        status,
        url.path(),
        body.trim()
      ));
    }

    response
      .json::<T>()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url.path(), e))
  }
}

/// Parse the configured base URL, making sure relative joins append to it.
fn parse_base_url(raw: &str) -> Result<Url> {
  let mut url =
    Url::parse(raw.trim()).map_err(|e| eyre!("Invalid KEN_ALL API base URL {}: {}", raw, e))?;
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}

fn address_url(base: &Url, postal_code: &str) -> Result<Url> {
  base
    .join(&format!("postalcode/{}", postal_code))
    .map_err(|e| eyre!("Invalid postal code {}: {}", postal_code, e))
}

fn address_search_url(base: &Url, options: &AddressSearchOptions) -> Result<Url> {
  let mut url = base
    .join("postalcode/")
    .map_err(|e| eyre!("Failed to build search URL: {}", e))?;
  {
    let mut query = url.query_pairs_mut();
    query.append_pair("q", &options.q);
    if let Some(offset) = options.offset {
      query.append_pair("offset", &offset.to_string());
    }
    if let Some(limit) = options.limit {
      query.append_pair("limit", &limit.to_string());
    }
  }
  Ok(url)
}

fn corporate_search_url(base: &Url, options: &CorporateSearchOptions) -> Result<Url> {
  let mut url = base
    .join("houjinbangou")
    .map_err(|e| eyre!("Failed to build search URL: {}", e))?;
  {
    let mut query = url.query_pairs_mut();
    query.append_pair("q", &options.query);
    query.append_pair("mode", options.mode.as_str());
    if let Some(offset) = options.offset {
      query.append_pair("offset", &offset.to_string());
    }
    if let Some(limit) = options.limit {
      query.append_pair("limit", &limit.to_string());
    }
  }
  Ok(url)
}
