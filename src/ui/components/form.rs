use super::input::{InputResult, TextInput};
use super::select::Select;
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

const LABEL_WIDTH: usize = 12;

#[derive(Debug, Clone)]
pub enum FieldKind {
  Text(TextInput),
  Choice(Select),
}

#[derive(Debug, Clone)]
pub struct FormField {
  pub label: &'static str,
  pub kind: FieldKind,
}

impl FormField {
  pub fn text(label: &'static str) -> Self {
    Self {
      label,
      kind: FieldKind::Text(TextInput::new()),
    }
  }

  pub fn choice(label: &'static str, select: Select) -> Self {
    Self {
      label,
      kind: FieldKind::Choice(select),
    }
  }

  /// Text, or the selected value of a choice ("" when unset)
  pub fn value(&self) -> &str {
    match &self.kind {
      FieldKind::Text(input) => input.value(),
      FieldKind::Choice(select) => select.value().unwrap_or(""),
    }
  }

  pub fn set_value(&mut self, value: &str) {
    match &mut self.kind {
      FieldKind::Text(input) => input.set_value(value),
      FieldKind::Choice(select) => select.set_value(value),
    }
  }

  pub fn clear(&mut self) {
    match &mut self.kind {
      FieldKind::Text(input) => input.clear(),
      FieldKind::Choice(select) => select.clear(),
    }
  }
}

/// Events emitted by a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// The field at this index was edited
  Changed(usize),
}

/// Vertical list of labelled fields with one focused field.
///
/// Tab/↓ and Shift-Tab/↑ move focus; other keys go to the focused field.
/// Enter and Esc are left to the owning view.
#[derive(Debug, Clone)]
pub struct Form {
  fields: Vec<FormField>,
  focus: usize,
}

impl Form {
  pub fn new(fields: Vec<FormField>) -> Self {
    Self { fields, focus: 0 }
  }

  pub fn fields(&self) -> &[FormField] {
    &self.fields
  }

  pub fn value(&self, index: usize) -> &str {
    self.fields.get(index).map(FormField::value).unwrap_or("")
  }

  pub fn set_value(&mut self, index: usize, value: &str) {
    if let Some(field) = self.fields.get_mut(index) {
      field.set_value(value);
    }
  }

  pub fn focus(&self) -> usize {
    self.focus
  }

  pub fn set_focus(&mut self, index: usize) {
    if index < self.fields.len() {
      self.focus = index;
    }
  }

  pub fn reset(&mut self) {
    self.fields.iter_mut().for_each(FormField::clear);
    self.focus = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    let n = self.fields.len();
    if n == 0 {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % n;
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = (self.focus + n - 1) % n;
        return KeyResult::Handled;
      }
      KeyCode::Enter | KeyCode::Esc => return KeyResult::NotHandled,
      _ => {}
    }

    let focus = self.focus;
    match &mut self.fields[focus].kind {
      FieldKind::Text(input) => match input.handle_key(key) {
        InputResult::Changed => KeyResult::Event(FormEvent::Changed(focus)),
        InputResult::Consumed => KeyResult::Handled,
        InputResult::NotHandled => KeyResult::NotHandled,
      },
      FieldKind::Choice(select) => {
        if select.handle_key(key) {
          KeyResult::Event(FormEvent::Changed(focus))
        } else {
          KeyResult::NotHandled
        }
      }
    }
  }

  /// Render the form; `active` shows focus and the terminal cursor.
  pub fn render(&self, frame: &mut Frame, area: Rect, title: &str, active: bool) {
    let border = if active { Color::Cyan } else { Color::Blue };
    let block = Block::default()
      .title(format!(" {} ", title))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));
    let inner = block.inner(area);

    let mut cursor = None;
    let lines: Vec<Line> = self
      .fields
      .iter()
      .enumerate()
      .map(|(i, field)| {
        let focused = active && i == self.focus;
        let label = Span::styled(
          field.label,
          if focused {
            Style::default().fg(Color::Yellow).bold()
          } else {
            Style::default().fg(Color::DarkGray)
          },
        );
        let pad = " ".repeat(LABEL_WIDTH.saturating_sub(label.width()));

        let value = match &field.kind {
          FieldKind::Text(input) => {
            if focused {
              let (before, _) = input.split_at_cursor();
              let x = inner.x as usize + LABEL_WIDTH + Span::raw(before).width();
              cursor = Some(Position::new(x as u16, inner.y + i as u16));
            }
            Span::raw(input.value().to_string())
          }
          FieldKind::Choice(select) => {
            let style = if select.selected().is_some() {
              Style::default()
            } else {
              Style::default().fg(Color::DarkGray)
            };
            let text = if focused {
              format!("‹ {} ›", select.display())
            } else {
              select.display().to_string()
            };
            Span::styled(text, style)
          }
        };
        Line::from(vec![label, Span::raw(pad), value])
      })
      .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);

    if let Some(position) = cursor {
      if position.y < inner.bottom() && position.x < inner.right() {
        frame.set_cursor_position(position);
      }
    }
  }
}
