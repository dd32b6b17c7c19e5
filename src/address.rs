//! Postal-code handling and address-line autofill rules.

use std::collections::HashSet;
use std::hash::Hash;

use crate::kenall::Address;

/// Number of digits in a Japanese postal code.
pub const POSTAL_CODE_LEN: usize = 7;

/// JIS X 0401 prefecture codes and names.
pub const PREFECTURES: [(&str, &str); 47] = [
  ("01", "北海道"),
  ("02", "青森県"),
  ("03", "岩手県"),
  ("04", "宮城県"),
  ("05", "秋田県"),
  ("06", "山形県"),
  ("07", "福島県"),
  ("08", "茨城県"),
  ("09", "栃木県"),
  ("10", "群馬県"),
  ("11", "埼玉県"),
  ("12", "千葉県"),
  ("13", "東京都"),
  ("14", "神奈川県"),
  ("15", "新潟県"),
  ("16", "富山県"),
  ("17", "石川県"),
  ("18", "福井県"),
  ("19", "山梨県"),
  ("20", "長野県"),
  ("21", "岐阜県"),
  ("22", "静岡県"),
  ("23", "愛知県"),
  ("24", "三重県"),
  ("25", "滋賀県"),
  ("26", "京都府"),
  ("27", "大阪府"),
  ("28", "兵庫県"),
  ("29", "奈良県"),
  ("30", "和歌山県"),
  ("31", "鳥取県"),
  ("32", "島根県"),
  ("33", "岡山県"),
  ("34", "広島県"),
  ("35", "山口県"),
  ("36", "徳島県"),
  ("37", "香川県"),
  ("38", "愛媛県"),
  ("39", "高知県"),
  ("40", "福岡県"),
  ("41", "佐賀県"),
  ("42", "長崎県"),
  ("43", "熊本県"),
  ("44", "大分県"),
  ("45", "宮崎県"),
  ("46", "鹿児島県"),
  ("47", "沖縄県"),
];

/// Strip hyphens and turn full-width digits into ASCII.
pub fn canonicalize_postal_code(input: &str) -> String {
  input
    .chars()
    .filter(|&c| c != '-')
    .map(|c| match c {
      '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
      _ => c,
    })
    .collect()
}

/// Canonical code if `input` is complete enough to look up.
pub fn lookup_key(input: &str) -> Option<String> {
  let code = canonicalize_postal_code(input.trim());
  (code.chars().count() >= POSTAL_CODE_LEN).then_some(code)
}

/// `1234567` → `〒123-4567`. Anything else is shown as given.
pub fn format_postal_code(code: &str) -> String {
  if code.len() == POSTAL_CODE_LEN && code.is_ascii() {
    format!("〒{}-{}", &code[..3], &code[3..])
  } else {
    format!("〒{}", code)
  }
}

/// Two-digit prefecture code from a JIS X 0402 municipality code.
pub fn prefecture_code(jisx0402: &str) -> &str {
  jisx0402.get(..2).unwrap_or("")
}

pub fn prefecture_name(code: &str) -> Option<&'static str> {
  PREFECTURES
    .iter()
    .find(|(c, _)| *c == code)
    .map(|(_, name)| *name)
}

fn count_variations<'a, T, F>(addresses: impl IntoIterator<Item = &'a Address>, key: F) -> usize
where
  T: Eq + Hash,
  F: Fn(&'a Address) -> T,
{
  addresses.into_iter().map(key).collect::<HashSet<_>>().len()
}

fn join_non_empty<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
  parts
    .into_iter()
    .filter(|p| !p.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Address lines 1 and 2 to autofill from the addresses sharing a postal code.
///
/// Several candidates only fill line 1, and only when they agree on
/// prefecture, city and town.
pub fn build_address_lines(addresses: &[Address]) -> (String, String) {
  match addresses {
    [] => (String::new(), String::new()),
    [address] => {
      let line2 = format!("{}{}", address.building, address.floor);
      match &address.corporation {
        Some(corp) => (corp.block_lot.clone(), line2),
        None => (
          join_non_empty([
            address.kyoto_street.as_str(),
            address.town.as_str(),
            address.koaza.as_str(),
          ]),
          line2,
        ),
      }
    }
    [first, ..] => {
      if count_variations(addresses, |a| a.prefecture.as_str()) > 1
        || count_variations(addresses, |a| a.city.as_str()) > 1
        || count_variations(addresses, |a| a.town.as_str()) > 1
      {
        return (String::new(), String::new());
      }

      let line1 = if count_variations(addresses, |a| a.koaza.as_str()) == 1 {
        let streets = count_variations(
          addresses.iter().filter(|a| !a.kyoto_street.is_empty()),
          |a| a.kyoto_street.as_str(),
        );
        let street = if streets == 1 {
          first.kyoto_street.as_str()
        } else {
          ""
        };
        join_non_empty([street, first.town.as_str(), first.koaza.as_str()])
      } else {
        first.town.clone()
      };
      (line1, String::new())
    }
  }
}

fn address_tail(address: &Address) -> String {
  let block_lot = address
    .corporation
    .as_ref()
    .map(|c| c.block_lot.as_str())
    .unwrap_or("");
  [
    address.kyoto_street.as_str(),
    address.koaza.as_str(),
    block_lot,
    address.building.as_str(),
    address.floor.as_str(),
  ]
  .concat()
}

/// One-line rendering of a reverse lookup candidate.
pub fn candidate_to_address(address: &Address) -> String {
  let head = format!("{}{}{}", address.prefecture, address.city, address.town);
  join_non_empty([head.as_str(), address_tail(address).as_str()])
}

/// Text an autocomplete suggestion puts into the address input.
pub fn suggestion_value(address: &Address) -> String {
  format!(
    "{}{}{} {}",
    address.prefecture,
    address.city,
    address.town,
    address_tail(address)
  )
  .trim_end()
  .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kenall::Corporation;

  fn addr(prefecture: &str, city: &str, town: &str, koaza: &str) -> Address {
    Address {
      jisx0402: "26104".to_string(),
      postal_code: "6040000".to_string(),
      prefecture: prefecture.to_string(),
      city: city.to_string(),
      town: town.to_string(),
      koaza: koaza.to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_canonicalize_postal_code() {
    assert_eq!(canonicalize_postal_code("100-0001"), "1000001");
    assert_eq!(canonicalize_postal_code("１００－0001"), "100－0001");
    assert_eq!(canonicalize_postal_code("１００-０００１"), "1000001");
  }

  #[test]
  fn test_lookup_key_needs_full_code() {
    assert_eq!(lookup_key("100-001"), None);
    assert_eq!(lookup_key(" 100-0001 ").as_deref(), Some("1000001"));
  }

  #[test]
  fn test_format_postal_code() {
    assert_eq!(format_postal_code("1000001"), "〒100-0001");
    assert_eq!(format_postal_code("100"), "〒100");
  }

  #[test]
  fn test_prefecture_tables() {
    assert_eq!(prefecture_code("13101"), "13");
    assert_eq!(prefecture_code("1"), "");
    assert_eq!(prefecture_name("13"), Some("東京都"));
    assert_eq!(prefecture_name("47"), Some("沖縄県"));
    assert_eq!(prefecture_name("48"), None);
  }

  #[test]
  fn test_no_candidates() {
    assert_eq!(build_address_lines(&[]), (String::new(), String::new()));
  }

  #[test]
  fn test_single_candidate() {
    let mut a = addr("京都府", "京都市中京区", "先斗町", "");
    a.kyoto_street = "三条下る".to_string();
    a.building = "ビル".to_string();
    a.floor = "3階".to_string();
    assert_eq!(
      build_address_lines(&[a]),
      ("三条下る 先斗町".to_string(), "ビル3階".to_string())
    );
  }

  #[test]
  fn test_single_business_candidate() {
    let mut a = addr("東京都", "千代田区", "大手町", "");
    a.corporation = Some(Corporation {
      block_lot: "２丁目３－１".to_string(),
      ..Default::default()
    });
    assert_eq!(
      build_address_lines(&[a]),
      ("２丁目３－１".to_string(), String::new())
    );
  }

  #[test]
  fn test_several_towns_do_not_fill() {
    let a = addr("東京都", "千代田区", "丸の内", "");
    let b = addr("東京都", "千代田区", "大手町", "");
    assert_eq!(build_address_lines(&[a, b]), (String::new(), String::new()));
  }

  #[test]
  fn test_several_candidates_same_koaza() {
    let mut a = addr("京都府", "京都市中京区", "菊屋町", "");
    a.kyoto_street = "寺町通二条下る".to_string();
    let b = addr("京都府", "京都市中京区", "菊屋町", "");
    assert_eq!(
      build_address_lines(&[a, b]),
      ("寺町通二条下る 菊屋町".to_string(), String::new())
    );
  }

  #[test]
  fn test_several_kyoto_streets_are_dropped() {
    let mut a = addr("京都府", "京都市中京区", "菊屋町", "");
    a.kyoto_street = "寺町通二条下る".to_string();
    let mut b = a.clone();
    b.kyoto_street = "河原町通二条上る".to_string();
    assert_eq!(
      build_address_lines(&[a, b]),
      ("菊屋町".to_string(), String::new())
    );
  }

  #[test]
  fn test_several_koazas_fill_town_only() {
    let a = addr("北海道", "札幌市", "北一条", "東");
    let b = addr("北海道", "札幌市", "北一条", "西");
    assert_eq!(
      build_address_lines(&[a, b]),
      ("北一条".to_string(), String::new())
    );
  }

  #[test]
  fn test_candidate_rendering() {
    let mut a = addr("東京都", "千代田区", "千代田", "");
    assert_eq!(candidate_to_address(&a), "東京都千代田区千代田");
    assert_eq!(suggestion_value(&a), "東京都千代田区千代田");

    a.building = "ビル".to_string();
    a.floor = "1階".to_string();
    assert_eq!(candidate_to_address(&a), "東京都千代田区千代田 ビル1階");
    assert_eq!(suggestion_value(&a), "東京都千代田区千代田 ビル1階");
  }
}
