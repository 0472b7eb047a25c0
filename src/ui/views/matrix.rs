use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::config::Thresholds;
use crate::mesh::types::{MeshColumn, MeshResults, MetricType};
use crate::ui::format::{format_value, truncate};
use crate::ui::{classify, SlaLevel};

const LABEL_WIDTH: u16 = 18;
const CELL_WIDTH: u16 = 9;

pub fn draw_matrix(
  frame: &mut Frame,
  area: Rect,
  results: &MeshResults,
  metric: MetricType,
  thresholds: &Thresholds,
  selected: (usize, usize),
) {
  let block = Block::default()
    .title(format!(" Mesh matrix: {} ", metric.label()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if results.is_empty() {
    let paragraph = Paragraph::new("No mesh results yet. They appear after the first refresh.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let axis = results.agent_ids();

  let header = Row::new(
    std::iter::once(Cell::from(""))
      .chain(axis.iter().map(|agent_id| {
        Cell::from(truncate(&results.agents.label(agent_id), CELL_WIDTH as usize - 1))
          .style(Style::default().add_modifier(Modifier::BOLD))
      }))
      .collect::<Vec<_>>(),
  );

  let rows: Vec<Row> = axis
    .iter()
    .enumerate()
    .map(|(row_index, from_agent)| {
      let label = Cell::from(truncate(
        &results.agents.label(from_agent),
        LABEL_WIDTH as usize - 1,
      ))
      .style(Style::default().add_modifier(Modifier::BOLD));

      let cells = axis.iter().enumerate().map(|(column_index, to_agent)| {
        let (text, mut style) = if from_agent == to_agent {
          // The diagonal stays blank
          (String::new(), Style::default())
        } else {
          let connection = results.connection(from_agent, to_agent);
          let level = cell_level(connection, metric, thresholds, from_agent, to_agent);
          let text = match connection {
            Some(column) if !column.has_no_data() => format_value(column.value_of(metric), metric),
            _ => "-".to_string(),
          };
          (text, level.cell_style())
        };

        if selected == (row_index, column_index) {
          style = style.add_modifier(Modifier::REVERSED);
        }
        Cell::from(text).style(style)
      });

      Row::new(std::iter::once(label).chain(cells).collect::<Vec<_>>())
    })
    .collect();

  let mut widths = vec![Constraint::Length(LABEL_WIDTH)];
  widths.extend(std::iter::repeat(Constraint::Length(CELL_WIDTH)).take(axis.len()));

  let table = Table::new(rows, widths).header(header).block(block);
  frame.render_widget(table, area);
}

fn cell_level(
  connection: Option<&MeshColumn>,
  metric: MetricType,
  thresholds: &Thresholds,
  from_agent: &str,
  to_agent: &str,
) -> SlaLevel {
  let Some(connection) = connection else {
    return SlaLevel::NoData;
  };
  if connection.has_no_data() {
    return SlaLevel::NoData;
  }
  classify(
    connection.value_of(metric),
    thresholds.warning(from_agent, to_agent),
    thresholds.critical(from_agent, to_agent),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{ThresholdLevels, ThresholdOverride};
  use crate::mesh::types::{HealthItem, Metric};
  use chrono::Utc;

  fn thresholds() -> Thresholds {
    Thresholds {
      defaults: ThresholdLevels {
        warning: 200.0,
        critical: 400.0,
      },
      overrides: vec![ThresholdOverride {
        from: "10".to_string(),
        to: "20".to_string(),
        warning: Some(1.0),
        critical: None,
      }],
    }
  }

  fn connection(latency: f64, loss: f64) -> MeshColumn {
    MeshColumn {
      agent_id: "20".to_string(),
      latency_millisec: Metric {
        health: String::new(),
        value: latency,
      },
      jitter_millisec: Metric::default(),
      packet_loss_percent: Metric {
        health: String::new(),
        value: loss,
      },
      health: vec![HealthItem {
        jitter_millisec: 0.0,
        latency_millisec: latency,
        packet_loss_percent: loss,
        time: Utc::now(),
      }],
    }
  }

  #[test]
  fn test_missing_connection_has_no_data() {
    let level = cell_level(None, MetricType::Latency, &thresholds(), "10", "30");
    assert_eq!(level, SlaLevel::NoData);
  }

  #[test]
  fn test_full_packet_loss_has_no_data() {
    let column = connection(10.0, 100.0);
    let level = cell_level(Some(&column), MetricType::Latency, &thresholds(), "30", "20");
    assert_eq!(level, SlaLevel::NoData);
  }

  #[test]
  fn test_levels_follow_thresholds_with_overrides() {
    let column = connection(10.0, 0.0);

    // Default thresholds: 10ms latency is healthy
    let level = cell_level(Some(&column), MetricType::Latency, &thresholds(), "30", "20");
    assert_eq!(level, SlaLevel::Healthy);

    // The 10→20 override drops the warning threshold to 1ms
    let level = cell_level(Some(&column), MetricType::Latency, &thresholds(), "10", "20");
    assert_eq!(level, SlaLevel::Warning);
  }
}
