//! Records and request options for the KEN_ALL API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::api_types::{lenient_date, lenient_flag, null_as_default};

/// One postal-code record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
  #[serde(default, deserialize_with = "null_as_default")]
  pub jisx0402: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub old_code: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub postal_code: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub prefecture: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub prefecture_kana: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub city: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub city_kana: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub town: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub town_kana: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub town_raw: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub town_kana_raw: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub koaza: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub kyoto_street: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub building: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub floor: String,
  #[serde(default)]
  pub town_partial: bool,
  #[serde(default)]
  pub town_addressed_koaza: bool,
  #[serde(default)]
  pub town_multi: bool,
  #[serde(default)]
  pub town_chome: bool,
  /// Present for business-specific postal codes
  #[serde(default)]
  pub corporation: Option<Corporation>,
}

/// Business that owns an individual postal code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corporation {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub name_kana: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub block_lot: String,
  #[serde(default)]
  pub block_lot_num: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub post_office: String,
  #[serde(default)]
  pub code_type: Option<u8>,
}

/// One entry of the National Tax Agency corporate number registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorporateInfo {
  #[serde(default, deserialize_with = "null_as_default")]
  pub corporate_number: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  pub furigana: Option<String>,
  pub kind: Option<String>,
  pub process: Option<String>,
  #[serde(default, deserialize_with = "lenient_flag")]
  pub latest: bool,
  pub prefecture_name: Option<String>,
  pub city_name: Option<String>,
  pub street_number: Option<String>,
  pub town: Option<String>,
  pub kyoto_street: Option<String>,
  pub block_lot_num: Option<String>,
  pub building: Option<String>,
  pub floor_room: Option<String>,
  pub post_code: Option<String>,
  pub jisx0402: Option<String>,
  pub en_name: Option<String>,
  pub close_cause: Option<String>,
  #[serde(default, deserialize_with = "lenient_date")]
  pub update_date: Option<NaiveDate>,
  #[serde(default, deserialize_with = "lenient_date")]
  pub change_date: Option<NaiveDate>,
  #[serde(default, deserialize_with = "lenient_date")]
  pub close_date: Option<NaiveDate>,
}

/// Address candidates with the total number of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Candidates {
  pub count: u64,
  pub data: Vec<Address>,
}

/// One page of corporate search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorporateResults {
  pub count: u64,
  pub offset: u64,
  pub data: Vec<CorporateInfo>,
}

/// How the corporate search matches names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
  #[default]
  Partial,
  Exact,
}

impl SearchMode {
  pub const ALL: [SearchMode; 2] = [SearchMode::Partial, SearchMode::Exact];

  /// Value sent as the `mode` query parameter
  pub fn as_str(self) -> &'static str {
    match self {
      SearchMode::Partial => "partial",
      SearchMode::Exact => "exact",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      SearchMode::Partial => "部分一致",
      SearchMode::Exact => "完全一致",
    }
  }
}

/// Free-text address search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AddressSearchOptions {
  pub q: String,
  pub offset: Option<u64>,
  pub limit: Option<u64>,
}

/// Corporate registry search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CorporateSearchOptions {
  /// Query in the registry's search syntax (`name:"..." AND prefecture_name:...`)
  pub query: String,
  pub mode: SearchMode,
  pub offset: Option<u64>,
  pub limit: Option<u64>,
}

impl CorporateSearchOptions {
  /// Same search, different window.
  pub fn window(&self, offset: u64, limit: u64) -> Self {
    Self {
      offset: Some(offset),
      limit: Some(limit),
      ..self.clone()
    }
  }
}
