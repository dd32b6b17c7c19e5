use super::ViewContext;
use crate::address::{
  build_address_lines, candidate_to_address, format_postal_code, lookup_key, prefecture_code,
  PREFECTURES,
};
use crate::kenall::{Address, CachedKenallClient};
use crate::query::{Query, QueryState};
use crate::ui::components::{Form, FormEvent, FormField, KeyResult, Select, SelectOption};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use std::time::{Duration, Instant};
use tracing::debug;

const POSTAL: usize = 0;
const PREFECTURE: usize = 1;
const CITY: usize = 2;
const ADDRESS1: usize = 3;
const ADDRESS2: usize = 4;

type Lookup = Query<(String, Vec<Address>)>;

struct PendingAutofill {
  at: Instant,
  addresses: Vec<Address>,
}

/// Postal code → address form with delayed autofill
pub struct LookupView {
  client: CachedKenallClient,
  delay: Duration,
  form: Form,
  editing: bool,
  lookup: Option<Lookup>,
  /// Code of the lookup in flight or last answered
  looked_up: Option<String>,
  autofill: Option<PendingAutofill>,
}

impl LookupView {
  pub fn new(ctx: &ViewContext) -> Self {
    let prefectures = PREFECTURES
      .iter()
      .map(|(code, name)| SelectOption::new(*code, *name))
      .collect();
    let form = Form::new(vec![
      FormField::text("郵便番号"),
      FormField::choice("都道府県", Select::optional(prefectures, "選択してください")),
      FormField::text("市区町村"),
      FormField::text("住所1"),
      FormField::text("住所2"),
    ]);

    Self {
      client: ctx.client.clone(),
      delay: Duration::from_millis(ctx.config.lookup.autofill_delay_ms),
      form,
      editing: true,
      lookup: None,
      looked_up: None,
      autofill: None,
    }
  }

  /// Autofill only ever writes into an untouched form
  fn rest_is_empty(&self) -> bool {
    [PREFECTURE, CITY, ADDRESS1, ADDRESS2]
      .iter()
      .all(|&i| self.form.value(i).is_empty())
  }

  fn on_change(&mut self) {
    // Any edit cancels a pending autofill
    self.autofill = None;

    if !self.rest_is_empty() {
      return;
    }
    let Some(code) = lookup_key(self.form.value(POSTAL)) else {
      self.lookup = None;
      self.looked_up = None;
      return;
    };
    if self.looked_up.as_deref() == Some(code.as_str()) {
      // Same code again: schedule from the answer we already have
      if let Some((_, addresses)) = self.lookup.as_ref().and_then(|q| q.data()) {
        let addresses = addresses.clone();
        self.schedule(addresses);
      }
      return;
    }

    debug!(postal_code = %code, "looking up postal code");
    let client = self.client.clone();
    let key = code.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      let key = key.clone();
      async move {
        let addresses = client.get_address(&key).await.map_err(|e| e.to_string())?;
        Ok((key, addresses))
      }
    });
    query.fetch();
    self.lookup = Some(query);
    self.looked_up = Some(code);
  }

  fn schedule(&mut self, addresses: Vec<Address>) {
    if addresses.is_empty() || !self.rest_is_empty() {
      return;
    }
    self.autofill = Some(PendingAutofill {
      at: Instant::now() + self.delay,
      addresses,
    });
  }

  fn on_lookup_done(&mut self) {
    let answer = match self.lookup.as_ref().map(|q| q.state()) {
      Some(QueryState::Success((code, addresses))) => Some((code.clone(), addresses.clone())),
      Some(QueryState::Error(_)) => {
        // Allow the same code to be retried by editing
        self.looked_up = None;
        None
      }
      _ => None,
    };
    let Some((code, addresses)) = answer else {
      return;
    };

    // Normalize what was typed, as long as it still denotes this code
    if lookup_key(self.form.value(POSTAL)).as_deref() == Some(code.as_str()) {
      self.form.set_value(POSTAL, &code);
      self.schedule(addresses);
    }
  }

  fn apply_autofill(&mut self, addresses: &[Address]) {
    // The user may have typed during the delay
    if !self.rest_is_empty() {
      return;
    }
    let Some(first) = addresses.first() else {
      return;
    };
    let (line1, line2) = build_address_lines(addresses);
    self.form.set_value(PREFECTURE, prefecture_code(&first.jisx0402));
    self.form.set_value(CITY, &first.city);
    self.form.set_value(ADDRESS1, &line1);
    self.form.set_value(ADDRESS2, &line2);
    debug!(postal_code = %first.postal_code, "address autofilled");
  }

  fn reset(&mut self) {
    self.form.reset();
    self.lookup = None;
    self.looked_up = None;
    self.autofill = None;
    self.editing = true;
  }

  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" 候補 ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let status = match self.lookup.as_ref().map(|q| q.state()) {
      Some(QueryState::Loading) => Some(Line::styled("検索中...", Style::default().fg(Color::Yellow))),
      Some(QueryState::Error(e)) => Some(Line::styled(
        format!("取得時にエラーが発生しました: {}", e),
        Style::default().fg(Color::Red),
      )),
      Some(QueryState::Success((_, addresses))) if addresses.is_empty() => Some(Line::styled(
        "該当する住所がありません",
        Style::default().fg(Color::DarkGray),
      )),
      None | Some(QueryState::Idle) => Some(Line::styled(
        "郵便番号を7桁入力すると住所を補完します",
        Style::default().fg(Color::DarkGray),
      )),
      Some(QueryState::Success(_)) => None,
    };
    if let Some(line) = status {
      frame.render_widget(Paragraph::new(line).block(block), area);
      return;
    }

    let addresses = self
      .lookup
      .as_ref()
      .and_then(|q| q.data())
      .map(|(_, a)| a.as_slice())
      .unwrap_or(&[]);
    let mut items: Vec<ListItem> = Vec::with_capacity(addresses.len() + 1);
    if let Some(pending) = &self.autofill {
      let left = pending.at.saturating_duration_since(Instant::now());
      items.push(ListItem::new(Line::styled(
        format!("● {:.1}秒後に補完します", left.as_secs_f32()),
        Style::default().fg(Color::Red),
      )));
    }
    items.extend(addresses.iter().map(|address| {
      ListItem::new(Line::from(vec![
        Span::styled(
          format!("{:<10}", format_postal_code(&address.postal_code)),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::raw(candidate_to_address(address)),
      ]))
    }));
    frame.render_widget(List::new(items).block(block), area);
  }
}

impl View for LookupView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.reset();
      return ViewAction::None;
    }

    if self.editing {
      match self.form.handle_key(key) {
        KeyResult::Event(FormEvent::Changed(_)) => self.on_change(),
        KeyResult::Handled => {}
        KeyResult::NotHandled => match key.code {
          KeyCode::Esc => self.editing = false,
          KeyCode::Enter => {
            let next = (self.form.focus() + 1) % self.form.fields().len();
            self.form.set_focus(next);
          }
          _ => {}
        },
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('i') | KeyCode::Enter => self.editing = true,
      KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
        let next = (self.form.focus() + 1) % self.form.fields().len();
        self.form.set_focus(next);
      }
      KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
        let n = self.form.fields().len();
        self.form.set_focus((self.form.focus() + n - 1) % n);
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let height = self.form.fields().len() as u16 + 2;
    let [form_area, status_area] =
      Layout::vertical([Constraint::Length(height), Constraint::Min(3)]).areas(area);

    self.form.render(frame, form_area, "住所入力", self.editing);
    self.render_status(frame, status_area);
  }

  fn breadcrumb_label(&self) -> String {
    "Lookup".to_string()
  }

  fn is_editing(&self) -> bool {
    self.editing
  }

  fn tick(&mut self) {
    if self.lookup.as_mut().is_some_and(|q| q.poll()) {
      self.on_lookup_done();
    }

    let due = self
      .autofill
      .as_ref()
      .is_some_and(|pending| Instant::now() >= pending.at);
    if due {
      if let Some(pending) = self.autofill.take() {
        self.apply_autofill(&pending.addresses);
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.editing {
      vec![
        ShortcutInfo::new("tab", "next field").with_priority(10),
        ShortcutInfo::new("ctrl-r", "reset").with_priority(20),
        ShortcutInfo::new("esc", "done").with_priority(30),
      ]
    } else {
      vec![
        ShortcutInfo::new(":", "command").with_priority(10),
        ShortcutInfo::new("i", "edit").with_priority(20),
        ShortcutInfo::new("ctrl-r", "reset").with_priority(25),
        ShortcutInfo::new("q", "back").with_priority(30),
      ]
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{ApiConfig, Config};
  use crate::kenall::KenallClient;

  fn view(delay_ms: u64) -> LookupView {
    let mut config = Config::default();
    config.lookup.autofill_delay_ms = delay_ms;
    let client = KenallClient::with_api_key(&ApiConfig::default(), "test").unwrap();
    let ctx = ViewContext {
      client: CachedKenallClient::with_client(client, &config),
      config,
    };
    LookupView::new(&ctx)
  }

  fn address(town: &str) -> Address {
    Address {
      jisx0402: "13101".to_string(),
      postal_code: "1000001".to_string(),
      prefecture: "東京都".to_string(),
      city: "千代田区".to_string(),
      town: town.to_string(),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn test_autofill_applies_after_delay() {
    let mut view = view(0);
    view.schedule(vec![address("千代田")]);
    assert!(view.autofill.is_some());

    view.tick();
    assert!(view.autofill.is_none());
    assert_eq!(view.form.value(PREFECTURE), "13");
    assert_eq!(view.form.value(CITY), "千代田区");
    assert_eq!(view.form.value(ADDRESS1), "千代田");
  }

  #[tokio::test]
  async fn test_edit_cancels_autofill() {
    let mut view = view(60_000);
    view.schedule(vec![address("千代田")]);
    view.form.set_focus(CITY);
    view.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
    assert!(view.autofill.is_none());
    assert_eq!(view.form.value(CITY), "x");
  }

  #[tokio::test]
  async fn test_autofill_skips_touched_form() {
    let mut view = view(0);
    view.schedule(vec![address("千代田")]);
    view.form.set_value(ADDRESS2, "5F");
    view.tick();
    assert_eq!(view.form.value(ADDRESS1), "");
    assert_eq!(view.form.value(PREFECTURE), "");
  }

  #[tokio::test]
  async fn test_short_code_does_not_look_up() {
    let mut view = view(0);
    for c in "100-00".chars() {
      view.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }
    assert!(view.lookup.is_none());
    assert!(view.looked_up.is_none());
  }

  #[tokio::test]
  async fn test_ctrl_r_resets() {
    let mut view = view(0);
    view.form.set_value(CITY, "千代田区");
    view.editing = false;
    view.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
    assert!(view.editing);
    assert_eq!(view.form.value(CITY), "");
  }
}
