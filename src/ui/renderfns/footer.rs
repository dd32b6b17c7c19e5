use super::utils::{display_width, truncate};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer: view breadcrumb on the left, status message after it
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], status: Option<&str>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }
    let style = if i + 1 == breadcrumb.len() {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  if let Some(status) = status {
    let used: usize = spans.iter().map(|s| display_width(&s.content)).sum::<usize>() + 3;
    let room = (area.width as usize).saturating_sub(used);
    spans.push(Span::raw("   "));
    spans.push(Span::styled(truncate(status, room), Style::default().fg(Color::Red)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
