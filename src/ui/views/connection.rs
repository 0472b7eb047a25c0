use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::config::ThresholdsConfig;
use crate::mesh::geo::distance_km;
use crate::mesh::types::{Coordinates, MeshResults, MetricType, MetricValue};
use crate::ui::classify;
use crate::ui::format::{format_value, sparkline};

/// Time-series detail for a single from→to connection, one section per
/// metric, rendered from the cached snapshot.
pub fn draw_connection(
  frame: &mut Frame,
  area: Rect,
  results: &MeshResults,
  from_agent: &str,
  to_agent: &str,
  thresholds: &ThresholdsConfig,
) {
  let title = format!(
    " {} -> {} ",
    results.agents.label(from_agent),
    results.agents.label(to_agent)
  );
  let outer = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));
  let inner = outer.inner(area);
  frame.render_widget(outer, area);

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1),
      Constraint::Ratio(1, 3),
      Constraint::Ratio(1, 3),
      Constraint::Ratio(1, 3),
    ])
    .split(inner);

  frame.render_widget(
    Paragraph::new(endpoints_summary(results, from_agent, to_agent))
      .style(Style::default().fg(Color::DarkGray)),
    chunks[0],
  );

  let metrics = [MetricType::Latency, MetricType::Jitter, MetricType::PacketLoss];
  for (metric, chunk) in metrics.into_iter().zip(chunks[1..].iter()) {
    draw_metric_section(frame, *chunk, results, from_agent, to_agent, metric, thresholds);
  }
}

/// Agent IPs plus the great-circle distance, as far as the directory knows
/// both endpoints.
fn endpoints_summary(results: &MeshResults, from_agent: &str, to_agent: &str) -> String {
  let (Some(from), Some(to)) = (
    results.agents.get_by_id(from_agent),
    results.agents.get_by_id(to_agent),
  ) else {
    return String::new();
  };

  let mut summary = format!("{} -> {}", from.ip, to.ip);
  if from.coords != Coordinates::default() && to.coords != Coordinates::default() {
    summary.push_str(&format!(
      "   distance {:.0} km",
      distance_km(from.coords, to.coords)
    ));
  }
  summary
}

fn draw_metric_section(
  frame: &mut Frame,
  area: Rect,
  results: &MeshResults,
  from_agent: &str,
  to_agent: &str,
  metric: MetricType,
  thresholds: &ThresholdsConfig,
) {
  let block = Block::default()
    .title(format!(" {} ", metric.label()))
    .borders(Borders::TOP);

  let series = results.filter(from_agent, to_agent, metric);
  if series.is_empty() {
    let paragraph = Paragraph::new("No data")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let values: Vec<MetricValue> = series.iter().map(|(_, value)| *value).collect();
  let latest = values[values.len() - 1];
  let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
  let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let avg = values.iter().sum::<MetricValue>() / values.len() as f64;

  let metric_thresholds = thresholds.for_metric(metric);
  let level = classify(
    latest,
    metric_thresholds.warning(from_agent, to_agent),
    metric_thresholds.critical(from_agent, to_agent),
  );

  // The server's own verdict for the most recent reading, when it sent one
  let upstream_verdict = results
    .connection(from_agent, to_agent)
    .map(|column| match metric {
      MetricType::Latency => column.latency_millisec.health.as_str(),
      MetricType::Jitter => column.jitter_millisec.health.as_str(),
      MetricType::PacketLoss => column.packet_loss_percent.health.as_str(),
    })
    .filter(|verdict| !verdict.is_empty());

  let mut current = vec![
    Span::raw("Current: "),
    Span::styled(
      format_value(latest, metric),
      level.text_style().add_modifier(Modifier::BOLD),
    ),
    Span::styled(format!("  ({})", level.label()), level.text_style()),
  ];
  if let Some(verdict) = upstream_verdict {
    current.push(Span::styled(
      format!("  upstream: {verdict}"),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let width = area.width.saturating_sub(2) as usize;
  let lines = vec![
    Line::from(current),
    Line::from(Span::styled(
      sparkline(&values, width),
      Style::default().fg(Color::Cyan),
    )),
    Line::from(Span::styled(
      format!(
        "min {}  avg {}  max {}  samples {}",
        format_value(min, metric),
        format_value(avg, metric),
        format_value(max, metric),
        values.len()
      ),
      Style::default().fg(Color::DarkGray),
    )),
  ];

  let paragraph = Paragraph::new(lines).block(block);
  frame.render_widget(paragraph, area);
}
