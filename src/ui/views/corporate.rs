use super::corporate_search::{CorporateSearch, SearchEvent};
use super::ViewContext;
use crate::corporate::CorporateForm;
use crate::kenall::CorporateInfo;
use crate::ui::components::{Form, FormField, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use tracing::info;

/// Corporate address form, filled from a registry search
pub struct CorporateView {
  ctx: ViewContext,
  form: Form,
  editing: bool,
  search: Option<CorporateSearch>,
}

impl CorporateView {
  pub fn new(ctx: &ViewContext) -> Self {
    let fields = CorporateForm::LABELS
      .iter()
      .map(|label| FormField::text(*label))
      .collect();
    Self {
      ctx: ctx.clone(),
      form: Form::new(fields),
      editing: true,
      search: None,
    }
  }

  fn values(&self) -> CorporateForm {
    let mut values = CorporateForm::default();
    for index in 0..CorporateForm::LABELS.len() {
      if let Some(slot) = values.field_mut(index) {
        *slot = self.form.value(index).to_string();
      }
    }
    values
  }

  fn open_search(&mut self) {
    let corporate = &self.ctx.config.corporate;
    self.search = Some(CorporateSearch::new(
      self.ctx.client.clone(),
      corporate.page_size,
      corporate.cache_capacity,
      &self.values().search_params(),
    ));
  }

  fn fill(&mut self, info: &CorporateInfo) {
    info!(corporate_number = %info.corporate_number, "corporate selected");
    let filled = CorporateForm::from(info);
    for (index, value) in filled.fields().into_iter().enumerate() {
      self.form.set_value(index, value);
    }
  }
}

impl View for CorporateView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(search) = &mut self.search {
      match search.handle_key(key) {
        KeyResult::Event(SearchEvent::Selected(info)) => {
          self.search = None;
          self.fill(&info);
        }
        KeyResult::Event(SearchEvent::Closed) => self.search = None,
        _ => {}
      }
      return ViewAction::None;
    }

    if key.code == KeyCode::Char('f') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.open_search();
      return ViewAction::None;
    }

    if self.editing {
      match self.form.handle_key(key) {
        KeyResult::NotHandled if key.code == KeyCode::Esc => self.editing = false,
        KeyResult::NotHandled if key.code == KeyCode::Enter => {
          self.form.set_focus(self.form.focus() + 1)
        }
        _ => {}
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('/') | KeyCode::Char('s') => self.open_search(),
      KeyCode::Char('i') | KeyCode::Enter => self.editing = true,
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let form_height = CorporateForm::LABELS.len() as u16 + 2;
    let [form_area, hint_area, _] = Layout::vertical([
      Constraint::Length(form_height),
      Constraint::Length(1),
      Constraint::Min(0),
    ])
    .areas(area);

    self.form.render(
      frame,
      form_area,
      "法人住所",
      self.editing && self.search.is_none(),
    );
    frame.render_widget(
      Paragraph::new(Line::styled(
        " Ctrl-F: 法人番号検索で入力",
        Style::default().fg(Color::DarkGray),
      )),
      hint_area,
    );

    if let Some(search) = &mut self.search {
      search.render(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Corporate".to_string()
  }

  fn is_editing(&self) -> bool {
    self.editing || self.search.is_some()
  }

  fn tick(&mut self) {
    if let Some(search) = &mut self.search {
      search.tick();
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.search.is_some() {
      return vec![
        ShortcutInfo::new("enter", "search/pick").with_priority(10),
        ShortcutInfo::new("tab", "focus").with_priority(15),
        ShortcutInfo::new("r", "retry").with_priority(20),
        ShortcutInfo::new("esc", "close").with_priority(30),
      ];
    }
    let mut shortcuts = vec![ShortcutInfo::new("ctrl-f", "search").with_priority(10)];
    if self.editing {
      shortcuts.push(ShortcutInfo::new("tab", "next field").with_priority(15));
      shortcuts.push(ShortcutInfo::new("esc", "done").with_priority(30));
    } else {
      shortcuts.push(ShortcutInfo::new(":", "command").with_priority(20));
      shortcuts.push(ShortcutInfo::new("q", "back").with_priority(30));
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{ApiConfig, Config};
  use crate::kenall::{CachedKenallClient, KenallClient};

  fn view() -> CorporateView {
    let config = Config::default();
    let client = KenallClient::with_api_key(&ApiConfig::default(), "test").unwrap();
    let ctx = ViewContext {
      client: CachedKenallClient::with_client(client, &config),
      config,
    };
    CorporateView::new(&ctx)
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_fill_from_selected_corporation() {
    let mut view = view();
    let info = CorporateInfo {
      corporate_number: "2021001052596".to_string(),
      name: "株式会社オープンコレクター".to_string(),
      prefecture_name: Some("東京都".to_string()),
      city_name: Some("千代田区".to_string()),
      post_code: Some("1010021".to_string()),
      ..Default::default()
    };
    view.fill(&info);

    let values = view.values();
    assert_eq!(values, CorporateForm::from(&info));
    assert_eq!(values.corporate_name, "株式会社オープンコレクター");
    assert_eq!(values.search_params().prefecture.as_deref(), Some("東京都"));
  }

  #[test]
  fn test_search_overlay_opens_and_closes() {
    let mut view = view();
    view.handle_key(KeyEvent::new(KeyCode::Char('f'), KeyModifiers::CONTROL));
    assert!(view.search.is_some());
    assert!(view.is_editing());

    view.handle_key(key(KeyCode::Esc));
    assert!(view.search.is_none());
  }

  #[test]
  fn test_esc_then_q_pops() {
    let mut view = view();
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::None));
    assert!(!view.is_editing());
    assert!(matches!(view.handle_key(key(KeyCode::Char('q'))), ViewAction::Pop));
  }
}
