//! Corporate registry search parameters and the corporate address form.

use crate::kenall::{CorporateInfo, CorporateSearchOptions, SearchMode};

/// Corporation kinds as `(code, label)`. The registry facets on the label.
pub const KINDS: [(&str, &str); 10] = [
  ("101", "行政機関など"),
  ("201", "地方公共団体"),
  ("301", "株式会社"),
  ("302", "有限会社"),
  ("303", "合名会社"),
  ("304", "合資会社"),
  ("305", "合同会社"),
  ("399", "その他の設立登記法人"),
  ("401", "外国会社等"),
  ("499", "その他"),
];

pub const MODES: [SearchMode; 2] = SearchMode::ALL;

pub fn kind_label(code: &str) -> Option<&'static str> {
  KINDS
    .iter()
    .find(|(c, _)| *c == code)
    .map(|(_, label)| *label)
}

/// What the user typed into the search overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
  pub corporate_name: String,
  pub prefecture: Option<String>,
  /// Kind code from `KINDS`
  pub kind: Option<String>,
  pub mode: Option<SearchMode>,
}

fn quote(value: &str) -> String {
  format!("\"{}\"", value.replace('"', "\\\""))
}

/// Turn search parameters into a registry query.
///
/// Empty parts are left out; an unknown kind code is ignored.
pub fn build_search_args(params: &SearchParams) -> CorporateSearchOptions {
  let mut terms = Vec::new();

  let name = params.corporate_name.trim();
  if !name.is_empty() {
    let quoted = quote(name);
    terms.push(format!("(name:{} OR furigana:{})", quoted, quoted));
  }
  if let Some(prefecture) = params.prefecture.as_deref().filter(|p| !p.is_empty()) {
    terms.push(format!("prefecture_name:{}", prefecture));
  }
  if let Some(label) = params.kind.as_deref().and_then(kind_label) {
    terms.push(format!("_facet_kind:/{}", label));
  }

  CorporateSearchOptions {
    query: terms.join(" AND "),
    mode: params.mode.unwrap_or_default(),
    offset: None,
    limit: None,
  }
}

/// The corporate address form filled in by picking a search result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorporateForm {
  pub corporate_name: String,
  pub corporate_number: String,
  pub postal_code: String,
  pub prefecture: String,
  pub city: String,
  pub address1: String,
  pub address2: String,
}

impl CorporateForm {
  pub const LABELS: [&'static str; 7] = [
    "法人名",
    "法人番号",
    "郵便番号",
    "都道府県",
    "市区町村",
    "住所1",
    "住所2",
  ];

  pub fn fields(&self) -> [&str; 7] {
    [
      self.corporate_name.as_str(),
      self.corporate_number.as_str(),
      self.postal_code.as_str(),
      self.prefecture.as_str(),
      self.city.as_str(),
      self.address1.as_str(),
      self.address2.as_str(),
    ]
  }

  pub fn field_mut(&mut self, index: usize) -> Option<&mut String> {
    match index {
      0 => Some(&mut self.corporate_name),
      1 => Some(&mut self.corporate_number),
      2 => Some(&mut self.postal_code),
      3 => Some(&mut self.prefecture),
      4 => Some(&mut self.city),
      5 => Some(&mut self.address1),
      6 => Some(&mut self.address2),
      _ => None,
    }
  }

  /// Overlay defaults taken from the form.
  pub fn search_params(&self) -> SearchParams {
    SearchParams {
      corporate_name: self.corporate_name.clone(),
      prefecture: Some(self.prefecture.clone()).filter(|p| !p.is_empty()),
      kind: None,
      mode: None,
    }
  }
}

impl From<&CorporateInfo> for CorporateForm {
  fn from(info: &CorporateInfo) -> Self {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    let address1 = match &info.town {
      Some(town) if !town.is_empty() => {
        format!("{}{}", town, info.block_lot_num.as_deref().unwrap_or(""))
      }
      _ => String::new(),
    };
    let building = match info.building.as_deref() {
      Some(b) if !b.is_empty() => format!("{} ", b),
      _ => String::new(),
    };

    Self {
      corporate_name: info.name.clone(),
      corporate_number: info.corporate_number.clone(),
      postal_code: text(&info.post_code),
      prefecture: text(&info.prefecture_name),
      city: text(&info.city_name),
      address1,
      address2: format!("{}{}", building, info.floor_room.as_deref().unwrap_or("")),
    }
  }
}
