use crate::address::PREFECTURES;
use crate::corporate::{build_search_args, SearchParams, KINDS, MODES};
use crate::kenall::{CachedKenallClient, CorporateInfo, CorporatePages, SearchMode};
use crate::paging::{PageError, PagedResultCache};
use crate::query::{Query, QueryState};
use crate::ui::components::{
  Form, FormField, KeyResult, RowRequestQueue, Select, SelectOption,
};
use crate::ui::renderfns::format_count;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

const NAME: usize = 0;
const PREFECTURE: usize = 1;
const KIND: usize = 2;
const MODE: usize = 3;

/// Rows kept around the viewport; the page cache holds the rest
const ROW_WINDOW: i64 = 300;

type RowResult = (i64, Result<Option<CorporateInfo>, PageError>);

#[derive(Debug, Clone)]
enum RowState {
  Loading,
  Ready(Box<CorporateInfo>),
  Unavailable,
}

/// Virtualized table over one corporate search.
///
/// Only rows that are on screen get requested, through a debounce queue.
/// Dropping the table cancels every lookup still pending on its cache.
struct ResultTable {
  cache: PagedResultCache<CorporatePages>,
  count: Query<u64>,
  rows: HashMap<i64, RowState>,
  queue: RowRequestQueue,
  tx: mpsc::UnboundedSender<RowResult>,
  rx: mpsc::UnboundedReceiver<RowResult>,
  state: TableState,
}

impl ResultTable {
  fn new(cache: PagedResultCache<CorporatePages>) -> Self {
    let for_count = cache.clone();
    let mut count = Query::new(move || {
      let cache = for_count.clone();
      async move { cache.count().await.map_err(|e| e.to_string()) }
    });
    count.fetch();

    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      cache,
      count,
      rows: HashMap::new(),
      queue: RowRequestQueue::default(),
      tx,
      rx,
      state: TableState::default().with_selected(Some(0)),
    }
  }

  fn total(&self) -> Option<u64> {
    self.count.data().copied()
  }

  fn selected_record(&self) -> Option<&CorporateInfo> {
    let index = self.state.selected()? as i64;
    match self.rows.get(&index) {
      Some(RowState::Ready(info)) => Some(info.as_ref()),
      _ => None,
    }
  }

  fn move_selection(&mut self, delta: i64) {
    let Some(total) = self.total().filter(|&t| t > 0) else {
      return;
    };
    let current = self.state.selected().unwrap_or(0) as i64;
    let next = (current + delta).clamp(0, total as i64 - 1);
    self.state.select(Some(next as usize));
  }

  /// Make failed rows eligible for another request; a failed count is
  /// fetched again.
  fn retry(&mut self) {
    self.rows.retain(|_, row| !matches!(row, RowState::Unavailable));
    if self.count.error().is_some() {
      self.count.refetch();
    }
  }

  fn tick(&mut self) {
    self.count.poll();

    while let Ok((index, result)) = self.rx.try_recv() {
      match result {
        Ok(Some(info)) => {
          self.rows.insert(index, RowState::Ready(Box::new(info)));
        }
        Ok(None) | Err(PageError::Canceled) => {
          self.rows.remove(&index);
        }
        Err(_) => {
          self.rows.insert(index, RowState::Unavailable);
        }
      }
    }

    if let Some(due) = self.queue.take_due(Instant::now()) {
      debug!(
        rows = due.len(),
        cached_pages = self.cache.cached_offsets().len(),
        fetches = self.cache.fetches_started(),
        "requesting corporate rows"
      );
      for index in due {
        if self.rows.contains_key(&index) {
          continue;
        }
        self.rows.insert(index, RowState::Loading);
        let cache = self.cache.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
          let result = cache.get(index).await;
          let _ = tx.send((index, result));
        });
      }
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
    let border = if focused { Color::Cyan } else { Color::Blue };
    let mut block = Block::default()
      .title(" 検索結果 ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    let total = match self.count.state() {
      QueryState::Success(total) => *total,
      QueryState::Error(e) => {
        let text = Line::styled(
          format!("取得時にエラーが発生しました: {}  (r で再試行)", e),
          Style::default().fg(Color::Red),
        );
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
      }
      _ => {
        let text = Line::styled("検索中...", Style::default().fg(Color::Yellow));
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
      }
    };
    block = block.title_bottom(
      Line::from(format!(" {}見つかりました ", format_count(total))).right_aligned(),
    );

    // Header row and borders take three lines
    let visible = area.height.saturating_sub(3) as usize;
    let selected = self.state.selected().unwrap_or(0);
    let mut top = self.state.offset();
    if selected < top {
      top = selected;
    } else if visible > 0 && selected >= top + visible {
      top = selected + 1 - visible;
    }
    let end = (top + visible).min(total as usize);

    let now = Instant::now();
    for index in top as i64..end as i64 {
      if !self.rows.contains_key(&index) && !self.queue.is_queued(index) {
        self.queue.enqueue(index, now);
      }
    }
    let (low, high) = (top as i64 - ROW_WINDOW, end as i64 + ROW_WINDOW);
    self.rows.retain(|&i, _| (low..high).contains(&i));

    let rows: Vec<Row> = (top..end)
      .map(|index| match self.rows.get(&(index as i64)) {
        Some(RowState::Ready(info)) => Row::new(vec![
          Cell::from(info.name.clone()),
          Cell::from(info.prefecture_name.clone().unwrap_or_default()),
          Cell::from(info.city_name.clone().unwrap_or_default()),
          Cell::from(info.street_number.clone().unwrap_or_default()),
        ]),
        Some(RowState::Unavailable) => {
          Row::new(vec!["-"; 4]).style(Style::default().fg(Color::Red))
        }
        _ => Row::new(vec![Cell::from(Span::styled(
          "…",
          Style::default().fg(Color::DarkGray),
        ))]),
      })
      .collect();

    let header = Row::new(vec!["法人名", "都道府県", "市区町村", "市区町村以下の住所"])
      .style(Style::default().fg(Color::Yellow).bold());
    let table = Table::new(
      rows,
      [
        Constraint::Percentage(35),
        Constraint::Length(10),
        Constraint::Length(14),
        Constraint::Fill(1),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    // Only the visible slice is handed to the widget
    let mut window = TableState::default().with_selected(Some(selected.saturating_sub(top)));
    frame.render_stateful_widget(table, area, &mut window);
    *self.state.offset_mut() = top;
  }
}

impl Drop for ResultTable {
  fn drop(&mut self) {
    self.cache.cancel_all();
  }
}

/// Events emitted by the search overlay
#[derive(Debug, Clone)]
pub enum SearchEvent {
  Selected(Box<CorporateInfo>),
  Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
  Params,
  Results,
}

/// Corporate registry search shown over the corporate form
pub struct CorporateSearch {
  client: CachedKenallClient,
  page_size: u64,
  capacity: usize,
  params: Form,
  focus: Focus,
  table: Option<ResultTable>,
  message: Option<&'static str>,
}

impl CorporateSearch {
  pub fn new(
    client: CachedKenallClient,
    page_size: u64,
    capacity: usize,
    defaults: &SearchParams,
  ) -> Self {
    let prefectures = PREFECTURES
      .iter()
      .map(|(_, name)| SelectOption::new(*name, *name))
      .collect();
    let kinds = KINDS
      .iter()
      .map(|(code, label)| SelectOption::new(*code, *label))
      .collect();
    let modes = MODES
      .iter()
      .map(|mode| SelectOption::new(mode.as_str(), mode.label()))
      .collect();

    let mut params = Form::new(vec![
      FormField::text("法人名"),
      FormField::choice("都道府県", Select::optional(prefectures, "指定なし")),
      FormField::choice("法人種別", Select::optional(kinds, "指定なし")),
      FormField::choice("検索方法", Select::new(modes)),
    ]);
    params.set_value(NAME, &defaults.corporate_name);
    if let Some(prefecture) = &defaults.prefecture {
      params.set_value(PREFECTURE, prefecture);
    }

    Self {
      client,
      page_size,
      capacity,
      params,
      focus: Focus::Params,
      table: None,
      message: None,
    }
  }

  fn search_params(&self) -> SearchParams {
    let optional = |i: usize| Some(self.params.value(i).to_string()).filter(|v| !v.is_empty());
    SearchParams {
      corporate_name: self.params.value(NAME).to_string(),
      prefecture: optional(PREFECTURE),
      kind: optional(KIND),
      mode: SearchMode::ALL
        .into_iter()
        .find(|m| m.as_str() == self.params.value(MODE)),
    }
  }

  fn submit(&mut self) {
    let options = build_search_args(&self.search_params());
    if options.query.is_empty() {
      self.message = Some("検索条件を入力してください");
      return;
    }
    self.message = None;

    info!(query = %options.query, mode = options.mode.as_str(), "corporate search");
    // Replacing the table cancels the lookups of the previous search
    let cache = self
      .client
      .corporate_pages(options, self.page_size, self.capacity);
    self.table = Some(ResultTable::new(cache));
    self.focus = Focus::Results;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if key.code == KeyCode::Esc {
      return KeyResult::Event(SearchEvent::Closed);
    }

    match self.focus {
      Focus::Params => match self.params.handle_key(key) {
        KeyResult::NotHandled if key.code == KeyCode::Enter => {
          self.submit();
          KeyResult::Handled
        }
        _ => KeyResult::Handled,
      },
      Focus::Results => {
        let Some(table) = &mut self.table else {
          self.focus = Focus::Params;
          return KeyResult::Handled;
        };
        match key.code {
          KeyCode::Char('j') | KeyCode::Down => table.move_selection(1),
          KeyCode::Char('k') | KeyCode::Up => table.move_selection(-1),
          KeyCode::PageDown => table.move_selection(20),
          KeyCode::PageUp => table.move_selection(-20),
          KeyCode::Char('g') | KeyCode::Home => table.move_selection(i64::MIN / 2),
          KeyCode::Char('G') | KeyCode::End => table.move_selection(i64::MAX / 2),
          KeyCode::Char('r') => table.retry(),
          KeyCode::Tab | KeyCode::BackTab | KeyCode::Char('/') => self.focus = Focus::Params,
          KeyCode::Enter => {
            if let Some(info) = table.selected_record() {
              return KeyResult::Event(SearchEvent::Selected(Box::new(info.clone())));
            }
          }
          _ => {}
        }
        KeyResult::Handled
      }
    }
  }

  pub fn tick(&mut self) {
    if let Some(table) = &mut self.table {
      table.tick();
    }
  }

  pub fn render(&mut self, frame: &mut Frame, area: Rect) {
    let overlay = Rect {
      x: area.x + 2,
      y: area.y + 1,
      width: area.width.saturating_sub(4),
      height: area.height.saturating_sub(2),
    };
    frame.render_widget(Clear, overlay);

    let params_height = self.params.fields().len() as u16 + 2;
    let [params_area, message_area, table_area] = Layout::vertical([
      Constraint::Length(params_height),
      Constraint::Length(1),
      Constraint::Min(3),
    ])
    .areas(overlay);

    self
      .params
      .render(frame, params_area, "法人番号検索", self.focus == Focus::Params);

    let hint = match self.message {
      Some(message) => Line::styled(message, Style::default().fg(Color::Red)),
      None => Line::styled(
        " Enter: 検索  Tab: 結果/条件  ←→: 選択肢  Esc: 閉じる",
        Style::default().fg(Color::DarkGray),
      ),
    };
    frame.render_widget(Paragraph::new(hint), message_area);

    match &mut self.table {
      Some(table) => table.render(frame, table_area, self.focus == Focus::Results),
      None => frame.render_widget(
        Block::default()
          .title(" 検索結果 ")
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Blue)),
        table_area,
      ),
    }
  }
}
