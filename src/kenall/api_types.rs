//! Serde-deserializable envelopes matching KEN_ALL API responses.
//!
//! Records themselves live in `types`; these wrappers only exist to peel the
//! response metadata off before handing data to the rest of the app.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::types::{Address, Candidates, CorporateInfo, CorporateResults};

// ============================================================================
// Response envelopes
// ============================================================================

/// `GET /postalcode/{code}`
#[derive(Debug, Deserialize)]
pub struct ApiAddressResolverResponse {
  #[serde(default, deserialize_with = "lenient_date")]
  pub version: Option<NaiveDate>,
  #[serde(default)]
  pub data: Vec<Address>,
}

/// `GET /postalcode/?q=...`
#[derive(Debug, Deserialize)]
pub struct ApiAddressSearchResponse {
  #[serde(default, deserialize_with = "lenient_date")]
  pub version: Option<NaiveDate>,
  #[serde(default)]
  pub data: Vec<Address>,
  #[serde(default)]
  pub count: u64,
  #[serde(default)]
  pub offset: u64,
  #[serde(default)]
  pub limit: u64,
}

/// `GET /houjinbangou?q=...`
#[derive(Debug, Deserialize)]
pub struct ApiCorporateSearchResponse {
  #[serde(default, deserialize_with = "lenient_date")]
  pub version: Option<NaiveDate>,
  #[serde(default)]
  pub data: Vec<CorporateInfo>,
  #[serde(default)]
  pub count: u64,
  #[serde(default)]
  pub offset: u64,
  #[serde(default)]
  pub limit: u64,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiAddressSearchResponse> for Candidates {
  fn from(resp: ApiAddressSearchResponse) -> Self {
    Candidates {
      count: resp.count,
      data: resp.data,
    }
  }
}

impl From<ApiCorporateSearchResponse> for CorporateResults {
  fn from(resp: ApiCorporateSearchResponse) -> Self {
    CorporateResults {
      count: resp.count,
      offset: resp.offset,
      data: resp.data,
    }
  }
}

// ============================================================================
// Field helpers
// ============================================================================

/// Read `null` as the type's default (empty string for text fields).
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse `YYYY-MM-DD`; empty or malformed dates read as absent.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<String>::deserialize(deserializer)?;
  Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

/// Accept `true`/`false`, `1`/`0` and their string forms.
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(serde_json::Value::Bool(b)) => b,
    Some(serde_json::Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
    Some(serde_json::Value::String(s)) => matches!(s.trim(), "1" | "true"),
    _ => false,
  })
}
