use crossterm::event::{KeyCode, KeyEvent};

/// One choice of a `Select`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
  pub value: String,
  pub label: String,
}

impl SelectOption {
  pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      label: label.into(),
    }
  }
}

/// Inline choice field cycled with ←/→ (or h/l).
///
/// With a placeholder the field can also be unset, which is where cycling
/// starts and wraps through.
#[derive(Debug, Clone)]
pub struct Select {
  options: Vec<SelectOption>,
  selected: Option<usize>,
  placeholder: Option<&'static str>,
}

impl Select {
  /// A select that is always set, starting on the first option
  pub fn new(options: Vec<SelectOption>) -> Self {
    Self {
      selected: if options.is_empty() { None } else { Some(0) },
      options,
      placeholder: None,
    }
  }

  /// A select that starts unset and shows `placeholder` while unset
  pub fn optional(options: Vec<SelectOption>, placeholder: &'static str) -> Self {
    Self {
      options,
      selected: None,
      placeholder: Some(placeholder),
    }
  }

  pub fn selected(&self) -> Option<&SelectOption> {
    self.selected.and_then(|i| self.options.get(i))
  }

  pub fn value(&self) -> Option<&str> {
    self.selected().map(|o| o.value.as_str())
  }

  /// Label of the current choice, or the placeholder
  pub fn display(&self) -> &str {
    self
      .selected()
      .map(|o| o.label.as_str())
      .or(self.placeholder)
      .unwrap_or("")
  }

  /// Select the option with `value`; unknown values unset an optional select
  pub fn set_value(&mut self, value: &str) {
    match self.options.iter().position(|o| o.value == value) {
      Some(i) => self.selected = Some(i),
      None if self.placeholder.is_some() => self.selected = None,
      None => {}
    }
  }

  pub fn clear(&mut self) {
    self.selected = if self.placeholder.is_some() || self.options.is_empty() {
      None
    } else {
      Some(0)
    };
  }

  fn step(&mut self, forward: bool) {
    let n = self.options.len();
    if n == 0 {
      return;
    }
    let optional = self.placeholder.is_some();
    self.selected = match (self.selected, forward) {
      (None, true) => Some(0),
      (None, false) => Some(n - 1),
      (Some(i), true) if i + 1 < n => Some(i + 1),
      (Some(_), true) => (!optional).then_some(0),
      (Some(0), false) => (!optional).then_some(n - 1),
      (Some(i), false) => Some(i - 1),
    };
  }

  /// Returns true if the choice changed
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    let before = self.selected;
    match key.code {
      KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => self.step(true),
      KeyCode::Left | KeyCode::Char('h') => self.step(false),
      KeyCode::Backspace | KeyCode::Delete if self.placeholder.is_some() => self.selected = None,
      _ => return false,
    }
    before != self.selected
  }
}
