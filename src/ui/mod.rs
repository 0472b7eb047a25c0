mod format;
mod views;

use crate::app::{App, ViewState};
use crate::mesh::types::MetricValue;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Cell classification driving the dashboard colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaLevel {
  Healthy,
  Warning,
  Critical,
  NoData,
}

impl SlaLevel {
  fn cell_style(self) -> Style {
    match self {
      SlaLevel::Healthy => Style::default().fg(Color::Black).bg(Color::Green),
      SlaLevel::Warning => Style::default().fg(Color::Black).bg(Color::Yellow),
      SlaLevel::Critical => Style::default().fg(Color::White).bg(Color::Red),
      SlaLevel::NoData => Style::default().fg(Color::DarkGray),
    }
  }

  fn text_style(self) -> Style {
    match self {
      SlaLevel::Healthy => Style::default().fg(Color::Green),
      SlaLevel::Warning => Style::default().fg(Color::Yellow),
      SlaLevel::Critical => Style::default().fg(Color::Red),
      SlaLevel::NoData => Style::default().fg(Color::DarkGray),
    }
  }

  fn label(self) -> &'static str {
    match self {
      SlaLevel::Healthy => "healthy",
      SlaLevel::Warning => "warning",
      SlaLevel::Critical => "critical",
      SlaLevel::NoData => "no data",
    }
  }
}

pub(crate) fn classify(value: MetricValue, warning: MetricValue, critical: MetricValue) -> SlaLevel {
  if value < warning {
    SlaLevel::Healthy
  } else if value < critical {
    SlaLevel::Warning
  } else {
    SlaLevel::Critical
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(2), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], app);

  // Draw current view
  match app.current_view() {
    Some(ViewState::Matrix { selected }) => {
      views::matrix::draw_matrix(
        frame,
        chunks[1],
        app.results(),
        app.metric(),
        app.config().thresholds.for_metric(app.metric()),
        *selected,
      );
    }
    Some(ViewState::Connection {
      from_agent,
      to_agent,
    }) => {
      views::connection::draw_connection(
        frame,
        chunks[1],
        app.results(),
        from_agent,
        to_agent,
        &app.config().thresholds,
      );
    }
    None => {}
  }

  draw_status_bar(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
  let results = app.results();

  let title = Line::from(vec![
    Span::styled("meshtop", Style::default().add_modifier(Modifier::BOLD)),
    Span::raw(format!("  test {}", app.config().test_id)),
    Span::raw(format!("  {} agents", results.rows.len())),
    Span::styled(
      format!("  {}", app.metric().label()),
      Style::default().fg(Color::Cyan),
    ),
  ]);

  let mut update = vec![
    Span::raw("Last update: "),
    Span::raw(format::format_timestamp(results.utc_timestamp)),
  ];
  if app.is_stale() {
    update.push(Span::styled(
      "  data is stale",
      Style::default().fg(Color::Red),
    ));
  }
  if app.is_refreshing() {
    update.push(Span::styled(
      "  refreshing...",
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(vec![title, Line::from(update)]);
  frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let hint = match app.current_view() {
    Some(ViewState::Connection { .. }) => " Esc/q:back  r:refresh  Ctrl-C:quit",
    _ => " h/j/k/l:nav  Enter:connection  m:metric  r:refresh  q:quit",
  };

  let paragraph = Paragraph::new(hint).style(Style::default().fg(Color::DarkGray));
  frame.render_widget(paragraph, area);
}
