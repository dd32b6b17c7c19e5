use super::{open, ViewContext};
use crate::commands::{CommandKind, COMMANDS};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// Root view listing the demos
pub struct MenuView {
  ctx: ViewContext,
  list_state: ListState,
}

impl MenuView {
  pub fn new(ctx: ViewContext) -> Self {
    Self {
      ctx,
      list_state: ListState::default().with_selected(Some(0)),
    }
  }

  fn entries() -> impl Iterator<Item = &'static crate::commands::Command> {
    COMMANDS.iter().filter(|c| c.kind != CommandKind::Quit)
  }
}

impl View for MenuView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Enter => {
        let selected = self.list_state.selected().unwrap_or(0);
        if let Some(cmd) = Self::entries().nth(selected) {
          if let Some(view) = open(cmd.kind, &self.ctx) {
            return ViewAction::Push(view);
          }
        }
      }
      // Popping the root view quits
      KeyCode::Char('q') => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [list_area, help_area] =
      Layout::vertical([Constraint::Min(3), Constraint::Length(4)]).areas(area);

    let items: Vec<ListItem> = Self::entries()
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<14}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::raw(cmd.description),
        ]))
      })
      .collect();
    ensure_valid_selection(&mut self.list_state, items.len());

    let list = List::new(items)
      .block(
        Block::default()
          .title(" KEN_ALL demos ")
          .title_alignment(Alignment::Center)
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Blue)),
      )
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, list_area, &mut self.list_state);

    let help = Paragraph::new(
      "Enter opens a demo. Form views start in edit mode: Tab moves between fields, \
       Esc leaves edit mode so that q goes back and : opens the command palette.",
    )
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area);
  }

  fn breadcrumb_label(&self) -> String {
    "Menu".to_string()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "open").with_priority(20),
      ShortcutInfo::new("q", "quit").with_priority(30),
    ]
  }
}
