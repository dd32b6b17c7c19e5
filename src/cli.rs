use crate::address::{
  build_address_lines, candidate_to_address, format_postal_code, lookup_key, prefecture_code,
  prefecture_name,
};
use crate::config::Config;
use crate::corporate::{build_search_args, SearchParams};
use crate::kenall::{CachedKenallClient, CorporateInfo, SearchMode};
use crate::ui::renderfns::format_count;
use color_eyre::{eyre::eyre, Result};
use tracing::info;

pub async fn lookup(config: &Config, postal: &str) -> Result<()> {
  let code = lookup_key(postal)
    .ok_or_else(|| eyre!("Not a postal code: {}", postal))?;
  let client = CachedKenallClient::new(config)?;

  let addresses = client.get_address(&code).await?;
  info!(postal_code = %code, candidates = addresses.len(), "looked up");
  if addresses.is_empty() {
    println!("{}: no address", format_postal_code(&code));
    return Ok(());
  }

  for address in &addresses {
    println!(
      "{}  {}",
      format_postal_code(&address.postal_code),
      candidate_to_address(address)
    );
  }

  let (address1, address2) = build_address_lines(&addresses);
  let first = &addresses[0];
  println!();
  let prefecture = prefecture_name(prefecture_code(&first.jisx0402)).unwrap_or(first.prefecture.as_str());
  println!("都道府県  {}", prefecture);
  println!("市区町村  {}", first.city);
  println!("住所1     {}", address1);
  println!("住所2     {}", address2);
  Ok(())
}

pub async fn search(config: &Config, address: &str, limit: Option<u64>) -> Result<()> {
  let client = CachedKenallClient::new(config)?;
  let limit = limit.unwrap_or(config.autocomplete.limit);

  let candidates = client.search_addresses(address, Some(limit)).await?;
  println!("{}", format_count(candidates.count));
  for address in &candidates.data {
    println!(
      "{}  {}",
      format_postal_code(&address.postal_code),
      candidate_to_address(address)
    );
  }
  Ok(())
}

pub struct CorpArgs {
  pub name: String,
  pub prefecture: Option<String>,
  pub kind: Option<String>,
  pub mode: SearchMode,
  pub rows: u64,
}

fn corporate_line(info: &CorporateInfo) -> String {
  let location: String = [&info.prefecture_name, &info.city_name, &info.street_number]
    .into_iter()
    .flatten()
    .map(String::as_str)
    .collect();
  format!("{}  {}  {}", info.corporate_number, info.name, location)
}

pub async fn corp(config: &Config, args: CorpArgs) -> Result<()> {
  let options = build_search_args(&SearchParams {
    corporate_name: args.name,
    prefecture: args.prefecture,
    kind: args.kind,
    mode: Some(args.mode),
  });
  if options.query.is_empty() {
    return Err(eyre!("Nothing to search for"));
  }

  let client = CachedKenallClient::new(config)?;
  let cache = client.corporate_pages(
    options,
    config.corporate.page_size,
    config.corporate.cache_capacity,
  );

  let total = cache.count().await?;
  println!("{}", format_count(total));
  for index in 0..args.rows.min(total) {
    match cache.get(index as i64).await? {
      Some(info) => println!("{:>4}  {}", index + 1, corporate_line(&info)),
      None => break,
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_corporate_line_skips_missing_parts() {
    let info = CorporateInfo {
      corporate_number: "1234567890123".to_string(),
      name: "テスト株式会社".to_string(),
      prefecture_name: Some("大阪府".to_string()),
      street_number: Some("北浜１丁目".to_string()),
      ..Default::default()
    };
    assert_eq!(corporate_line(&info), "1234567890123  テスト株式会社  大阪府北浜１丁目");
  }
}
