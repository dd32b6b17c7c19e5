use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 8;

/// Events emitted by the command palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// A command was chosen
  Run(&'static Command),
  /// Enter on input that matches nothing
  Unknown(String),
  /// Palette closed with Esc
  Cancelled,
}

/// `:` command palette with suggestions
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected = 0;
  }

  fn close(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(self.input.value())
  }

  /// Handle a key while the palette is open. Closed palettes ignore keys;
  /// the app decides when `:` opens one.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      KeyCode::Enter => {
        let event = match self.suggestions().get(self.selected) {
          Some(cmd) => CommandEvent::Run(cmd),
          None => CommandEvent::Unknown(self.input.value().trim().to_string()),
        };
        self.close();
        KeyResult::Event(event)
      }
      KeyCode::Tab | KeyCode::Down => {
        let n = self.suggestions().len();
        if n > 0 {
          self.selected = (self.selected + 1) % n;
        }
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        let n = self.suggestions().len();
        if n > 0 {
          self.selected = (self.selected + n - 1) % n;
        }
        KeyResult::Handled
      }
      _ => {
        if self.input.handle_key(key) == InputResult::Changed {
          self.selected = 0;
        }
        // Everything else is swallowed while the palette is open
        KeyResult::Handled
      }
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;
    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (3 + shown).min(area.height);
    let overlay = Rect::new(area.x + 1, area.y + 1, width, height).intersection(area);

    frame.render_widget(Clear, overlay);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);
    if inner.height == 0 {
      return;
    }

    let [input_area, list_area] =
      Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(input_line), input_area);

    if suggestions.is_empty() || list_area.height == 0 {
      return;
    }
    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<14}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();
    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default().with_selected(Some(self.selected));
    frame.render_stateful_widget(list, list_area, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::CommandKind;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(palette: &mut CommandInput, s: &str) {
    for c in s.chars() {
      palette.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_inactive_ignores_keys() {
    let mut palette = CommandInput::new();
    assert_eq!(palette.handle_key(key(KeyCode::Char('q'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_run_best_suggestion() {
    let mut palette = CommandInput::new();
    palette.activate();
    type_str(&mut palette, "corp");
    match palette.handle_key(key(KeyCode::Enter)) {
      KeyResult::Event(CommandEvent::Run(cmd)) => assert_eq!(cmd.kind, CommandKind::Corporate),
      other => panic!("unexpected {:?}", other),
    }
    assert!(!palette.is_active());
  }

  #[test]
  fn test_tab_moves_selection() {
    let mut palette = CommandInput::new();
    palette.activate();
    palette.handle_key(key(KeyCode::Tab));
    match palette.handle_key(key(KeyCode::Enter)) {
      KeyResult::Event(CommandEvent::Run(cmd)) => assert_eq!(cmd.name, "reverse"),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_unknown_and_cancel() {
    let mut palette = CommandInput::new();
    palette.activate();
    type_str(&mut palette, "xyz");
    assert_eq!(
      palette.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Unknown("xyz".to_string()))
    );

    palette.activate();
    assert_eq!(
      palette.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(CommandEvent::Cancelled)
    );
  }
}
