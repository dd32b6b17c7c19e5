use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of handling a key event in an input component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
  /// Buffer changed
  Changed,
  /// Key was handled without touching the buffer (cursor movement)
  Consumed,
  /// Key not handled, pass to next handler
  NotHandled,
}

/// Single-line text input.
///
/// The cursor counts characters, not bytes, so kana and kanji edit like
/// any other text.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  buffer: String,
  cursor: usize,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn with_value(value: impl Into<String>) -> Self {
    let mut input = Self::new();
    input.set_value(value);
    input
  }

  pub fn value(&self) -> &str {
    &self.buffer
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  /// Replace the contents and put the cursor at the end
  pub fn set_value(&mut self, value: impl Into<String>) {
    self.buffer = value.into();
    self.cursor = self.char_count();
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
  }

  /// Cursor position in characters
  #[cfg(test)]
  pub fn cursor_position(&self) -> usize {
    self.cursor
  }

  fn char_count(&self) -> usize {
    self.buffer.chars().count()
  }

  fn byte_index(&self, char_index: usize) -> usize {
    self
      .buffer
      .char_indices()
      .nth(char_index)
      .map(|(i, _)| i)
      .unwrap_or(self.buffer.len())
  }

  /// Text before and after the cursor
  pub fn split_at_cursor(&self) -> (&str, &str) {
    self.buffer.split_at(self.byte_index(self.cursor))
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Backspace => {
        if self.cursor == 0 {
          return InputResult::Consumed;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.buffer.remove(at);
        InputResult::Changed
      }
      KeyCode::Delete => {
        if self.cursor >= self.char_count() {
          return InputResult::Consumed;
        }
        let at = self.byte_index(self.cursor);
        self.buffer.remove(at);
        InputResult::Changed
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        InputResult::Consumed
      }
      KeyCode::Right => {
        self.cursor = (self.cursor + 1).min(self.char_count());
        InputResult::Consumed
      }
      KeyCode::Home => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::End => {
        self.cursor = self.char_count();
        InputResult::Consumed
      }
      KeyCode::Char('a') if ctrl => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('e') if ctrl => {
        self.cursor = self.char_count();
        InputResult::Consumed
      }
      KeyCode::Char('u') if ctrl => {
        // Clear line before cursor
        let at = self.byte_index(self.cursor);
        self.buffer.drain(..at);
        self.cursor = 0;
        InputResult::Changed
      }
      KeyCode::Char('w') if ctrl => {
        // Delete word before cursor
        let at = self.byte_index(self.cursor);
        let before = &self.buffer[..at];
        let start = before
          .trim_end()
          .rfind(char::is_whitespace)
          .map(|i| i + before[i..].chars().next().map_or(1, char::len_utf8))
          .unwrap_or(0);
        self.buffer.drain(start..at);
        self.cursor = self.buffer[..start].chars().count();
        InputResult::Changed
      }
      KeyCode::Char(_) if ctrl => InputResult::NotHandled,
      KeyCode::Char(c) => {
        let at = self.byte_index(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
        InputResult::Changed
      }
      _ => InputResult::NotHandled,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl_key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::CONTROL)
  }

  fn type_str(input: &mut TextInput, s: &str) {
    for c in s.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_basic_input() {
    let mut input = TextInput::new();
    assert!(input.is_empty());
    assert_eq!(input.handle_key(key(KeyCode::Char('1'))), InputResult::Changed);
    type_str(&mut input, "00-0001");
    assert_eq!(input.value(), "100-0001");
  }

  #[test]
  fn test_multibyte_editing() {
    let mut input = TextInput::new();
    type_str(&mut input, "東京都");
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Char('X')));
    assert_eq!(input.value(), "東京X都");
    assert_eq!(input.cursor_position(), 3);

    input.handle_key(key(KeyCode::Backspace));
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "東都");
    assert_eq!(input.split_at_cursor(), ("東", "都"));

    input.handle_key(key(KeyCode::Delete));
    assert_eq!(input.value(), "東");
  }

  #[test]
  fn test_cursor_stays_in_bounds() {
    let mut input = TextInput::with_value("ab");
    assert_eq!(input.cursor_position(), 2);
    input.handle_key(key(KeyCode::Right));
    assert_eq!(input.cursor_position(), 2);
    assert_eq!(input.handle_key(key(KeyCode::Delete)), InputResult::Consumed);
    input.handle_key(key(KeyCode::Home));
    assert_eq!(input.handle_key(key(KeyCode::Backspace)), InputResult::Consumed);
    assert_eq!(input.value(), "ab");
  }

  #[test]
  fn test_ctrl_u_clear_before_cursor() {
    let mut input = TextInput::with_value("横浜市 港北区");
    for _ in 0..3 {
      input.handle_key(key(KeyCode::Left));
    }
    input.handle_key(ctrl_key(KeyCode::Char('u')));
    assert_eq!(input.value(), "港北区");
    assert_eq!(input.cursor_position(), 0);
  }

  #[test]
  fn test_ctrl_w_deletes_word() {
    let mut input = TextInput::with_value("京都府 京都市");
    input.handle_key(ctrl_key(KeyCode::Char('w')));
    assert_eq!(input.value(), "京都府 ");
    input.handle_key(ctrl_key(KeyCode::Char('w')));
    assert_eq!(input.value(), "");
  }

  #[test]
  fn test_unknown_ctrl_passes_through() {
    let mut input = TextInput::new();
    assert_eq!(
      input.handle_key(ctrl_key(KeyCode::Char('r'))),
      InputResult::NotHandled
    );
    assert_eq!(input.handle_key(key(KeyCode::Enter)), InputResult::NotHandled);
    assert!(input.is_empty());
  }
}
