use super::ViewContext;
use crate::address::{candidate_to_address, format_postal_code, suggestion_value};
use crate::kenall::{Address, CachedKenallClient, Candidates};
use crate::query::{Query, QueryState};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::format_count;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Which demo an address search view is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSearchMode {
  /// Address → postal code candidates
  Reverse,
  /// Address input completed from suggestions
  Autocomplete,
}

impl AddressSearchMode {
  fn title(self) -> &'static str {
    match self {
      AddressSearchMode::Reverse => "住所から郵便番号を検索",
      AddressSearchMode::Autocomplete => "住所入力補完",
    }
  }

  /// Text the input takes when a candidate is chosen
  fn fill(self, address: &Address) -> String {
    match self {
      AddressSearchMode::Reverse => candidate_to_address(address),
      AddressSearchMode::Autocomplete => suggestion_value(address),
    }
  }
}

/// Free-text address search with a candidate list
pub struct AddressSearchView {
  mode: AddressSearchMode,
  client: CachedKenallClient,
  limit: u64,
  input: TextInput,
  editing: bool,
  candidates: Option<Query<Candidates>>,
  list_state: ListState,
}

impl AddressSearchView {
  pub fn new(ctx: &ViewContext, mode: AddressSearchMode) -> Self {
    Self {
      mode,
      client: ctx.client.clone(),
      limit: ctx.config.autocomplete.limit,
      input: TextInput::new(),
      editing: true,
      candidates: None,
      list_state: ListState::default(),
    }
  }

  fn addresses(&self) -> &[Address] {
    self
      .candidates
      .as_ref()
      .and_then(|q| q.data())
      .map(|c| c.data.as_slice())
      .unwrap_or(&[])
  }

  /// Search for the current input; an empty input clears the candidates
  fn search(&mut self) {
    let q = self.input.value().trim().to_string();
    if q.is_empty() {
      self.candidates = None;
      return;
    }

    let client = self.client.clone();
    let limit = self.limit;
    let mut query = Query::new(move || {
      let client = client.clone();
      let q = q.clone();
      async move {
        client
          .search_addresses(&q, Some(limit))
          .await
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    // Replacing the query aborts the search for the previous input
    self.candidates = Some(query);
    self.list_state.select(None);
  }

  fn choose(&mut self) {
    let Some(index) = self.list_state.selected() else {
      return;
    };
    if let Some(address) = self.addresses().get(index) {
      let value = self.mode.fill(address);
      self.input.set_value(value);
      self.candidates = None;
      self.list_state.select(None);
    }
  }

  fn render_input(&self, frame: &mut Frame, area: Rect) {
    let border = if self.editing { Color::Cyan } else { Color::Blue };
    let block = Block::default()
      .title(format!(" {} ", self.mode.title()))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(self.input.value()).block(block), area);

    if self.editing {
      let (before, _) = self.input.split_at_cursor();
      let x = inner.x + Span::raw(before).width() as u16;
      if x < inner.right() {
        frame.set_cursor_position(Position::new(x, inner.y));
      }
    }
  }

  fn render_candidates(&mut self, frame: &mut Frame, area: Rect) {
    let mut block = Block::default()
      .title(" 候補 ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let message = match self.candidates.as_ref().map(|q| q.state()) {
      None | Some(QueryState::Idle) => Some(Line::styled(
        "住所の一部を入力してください",
        Style::default().fg(Color::DarkGray),
      )),
      Some(QueryState::Loading) => Some(Line::styled("検索中...", Style::default().fg(Color::Yellow))),
      Some(QueryState::Error(e)) => Some(Line::styled(
        format!("取得時にエラーが発生しました: {}", e),
        Style::default().fg(Color::Red),
      )),
      Some(QueryState::Success(_)) => None,
    };
    if let Some(line) = message {
      frame.render_widget(Paragraph::new(line).block(block), area);
      return;
    }

    if let Some(candidates) = self.candidates.as_ref().and_then(|q| q.data()) {
      block = block.title_bottom(Line::from(format!(" {} ", format_count(candidates.count))).right_aligned());
    }

    let items: Vec<ListItem> = self
      .addresses()
      .iter()
      .map(|address| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<10}", format_postal_code(&address.postal_code)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::raw(candidate_to_address(address)),
        ]))
      })
      .collect();

    if let Some(selected) = self.list_state.selected() {
      if selected >= items.len() {
        ensure_valid_selection(&mut self.list_state, items.len());
      }
    }

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for AddressSearchView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    let has_candidates = !self.addresses().is_empty();

    match key.code {
      KeyCode::Down if has_candidates => {
        self.list_state.select_next();
        return ViewAction::None;
      }
      KeyCode::Up if has_candidates => {
        self.list_state.select_previous();
        return ViewAction::None;
      }
      KeyCode::Enter => {
        if self.list_state.selected().is_some() {
          self.choose();
        } else {
          self.editing = true;
        }
        return ViewAction::None;
      }
      _ => {}
    }

    if self.editing {
      match self.input.handle_key(key) {
        InputResult::Changed => self.search(),
        InputResult::Consumed => {}
        InputResult::NotHandled => {
          if key.code == KeyCode::Esc {
            self.editing = false;
          }
        }
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('i') => self.editing = true,
      KeyCode::Char('j') if has_candidates => self.list_state.select_next(),
      KeyCode::Char('k') if has_candidates => self.list_state.select_previous(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [input_area, list_area] =
      Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).areas(area);
    self.render_input(frame, input_area);
    self.render_candidates(frame, list_area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.mode {
      AddressSearchMode::Reverse => "Reverse".to_string(),
      AddressSearchMode::Autocomplete => "Autocomplete".to_string(),
    }
  }

  fn is_editing(&self) -> bool {
    self.editing
  }

  fn tick(&mut self) {
    if let Some(query) = &mut self.candidates {
      query.poll();
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new("↑↓", "candidates").with_priority(15),
      ShortcutInfo::new("enter", "choose").with_priority(20),
    ];
    if self.editing {
      shortcuts.push(ShortcutInfo::new("esc", "done").with_priority(30));
    } else {
      shortcuts.push(ShortcutInfo::new(":", "command").with_priority(10));
      shortcuts.push(ShortcutInfo::new("q", "back").with_priority(30));
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn address() -> Address {
    Address {
      postal_code: "2220033".to_string(),
      prefecture: "神奈川県".to_string(),
      city: "横浜市港北区".to_string(),
      town: "新横浜".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_fill_by_mode() {
    let mut a = address();
    assert_eq!(AddressSearchMode::Reverse.fill(&a), "神奈川県横浜市港北区新横浜");
    a.building = "ビル".to_string();
    assert_eq!(
      AddressSearchMode::Autocomplete.fill(&a),
      "神奈川県横浜市港北区新横浜 ビル"
    );
  }
}
