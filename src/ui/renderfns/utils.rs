use ratatui::text::Span;

/// Terminal cells `s` occupies; kanji and full-width kana take two.
pub fn display_width(s: &str) -> usize {
  Span::raw(s).width()
}

/// Truncate to at most `max_width` cells, adding "..." if truncated
pub fn truncate(s: &str, max_width: usize) -> String {
  if display_width(s) <= max_width {
    return s.to_string();
  }

  let budget = max_width.saturating_sub(3);
  let mut out = String::new();
  let mut used = 0;
  for c in s.chars() {
    let w = display_width(c.encode_utf8(&mut [0; 4]));
    if used + w > budget {
      break;
    }
    used += w;
    out.push(c);
  }
  out.push_str("...");
  out
}

/// `1234` → `1,234件`
pub fn format_count(count: u64) -> String {
  let digits = count.to_string();
  let mut out = String::new();
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out.push('件');
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_wide_chars() {
    assert_eq!(display_width("東京都"), 6);
    assert_eq!(truncate("東京都千代田区", 9), "東京都...");
    assert_eq!(truncate("東京都千代田区", 8), "東京...");
  }

  #[test]
  fn test_format_count() {
    assert_eq!(format_count(0), "0件");
    assert_eq!(format_count(999), "999件");
    assert_eq!(format_count(1234), "1,234件");
    assert_eq!(format_count(5_000_000), "5,000,000件");
  }
}
