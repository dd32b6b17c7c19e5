use crate::commands::CommandKind;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::kenall::CachedKenallClient;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{open, MenuView, ViewContext};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  ctx: ViewContext,

  /// Navigation stack; the menu is always at index 0
  views: Vec<Box<dyn View>>,

  /// `:` command palette
  command: CommandInput,

  /// One-line message shown in the footer
  status: Option<String>,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = CachedKenallClient::new(&config)?;
    Ok(Self::with_context(ViewContext { client, config }))
  }

  fn with_context(ctx: ViewContext) -> Self {
    Self {
      views: vec![Box::new(MenuView::new(ctx.clone()))],
      ctx,
      command: CommandInput::new(),
      status: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);
    info!(api = %self.ctx.client.client().base_url(), "started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }
    Ok(())
  }

  fn current(&mut self) -> Option<&mut Box<dyn View>> {
    self.views.last_mut()
  }

  fn tick(&mut self) {
    if let Some(view) = self.current() {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.command.handle_key(key) {
      KeyResult::Event(event) => return self.handle_command(event),
      KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    let editing = self.views.last().is_some_and(|v| v.is_editing());
    if key.code == KeyCode::Char(':') && !editing {
      self.status = None;
      self.command.activate();
      return;
    }

    let action = match self.current() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Pop,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        debug!(view = %view.breadcrumb_label(), "push");
        self.views.push(view);
      }
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn handle_command(&mut self, event: CommandEvent) {
    match event {
      CommandEvent::Run(command) => {
        debug!(command = command.name, "command");
        if command.kind == CommandKind::Quit {
          self.should_quit = true;
          return;
        }
        if let Some(view) = open(command.kind, &self.ctx) {
          // Commands switch between root screens
          self.views.truncate(1);
          self.views.push(view);
        }
      }
      CommandEvent::Unknown(input) => {
        self.status = Some(format!("Unknown command: {}", input));
      }
      CommandEvent::Cancelled => {}
    }
  }

  fn breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  fn draw(&mut self, frame: &mut Frame) {
    let [header_area, body_area, footer_area] = Layout::vertical([
      Constraint::Length(1),
      Constraint::Min(0),
      Constraint::Length(1),
    ])
    .areas(frame.area());

    let shortcuts = self
      .views
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default();
    let api_base = self.ctx.client.client().base_url().to_string();
    draw_header(
      frame,
      header_area,
      self.ctx.config.title(),
      &api_base,
      &shortcuts,
    );

    if let Some(view) = self.views.last_mut() {
      view.render(frame, body_area);
    }

    let breadcrumb = self.breadcrumb();
    draw_footer(frame, footer_area, &breadcrumb, self.status.as_deref());

    if self.command.is_active() {
      self.command.render_overlay(frame, body_area);
    }
  }
}
