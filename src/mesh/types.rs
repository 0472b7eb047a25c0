//! Domain model for mesh test results.
//!
//! Independent of the wire format spoken by the monitoring API; see
//! `api_types` for the transformation layer.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Identifier the monitoring API assigns to an agent.
pub type AgentId = String;

/// Latency and jitter are in milliseconds, packet loss in percent (0-100).
pub type MetricValue = f64;

/// Geographic location of an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coordinates {
  pub long: f64,
  pub lat: f64,
}

/// A monitoring agent participating in the mesh test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Agent {
  pub id: AgentId,
  pub ip: String,
  pub name: String,
  pub alias: String,
  pub coords: Coordinates,
}

/// Directory of agents keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Agents {
  agents: HashMap<AgentId, Agent>,
}

impl Agents {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, agent: Agent) {
    self.agents.insert(agent.id.clone(), agent);
  }

  pub fn get_by_id(&self, agent_id: &str) -> Option<&Agent> {
    self.agents.get(agent_id)
  }

  /// Display label for an agent: alias, then name, then the raw id when the
  /// agent is not in the directory.
  pub fn label(&self, agent_id: &str) -> String {
    match self.agents.get(agent_id) {
      Some(agent) if !agent.alias.is_empty() => agent.alias.clone(),
      Some(agent) if !agent.name.is_empty() => agent.name.clone(),
      _ => format!("[{agent_id}]"),
    }
  }

  pub fn count(&self) -> usize {
    self.agents.len()
  }
}

/// One of the three mesh connection metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
  #[default]
  Latency,
  Jitter,
  PacketLoss,
}

impl MetricType {
  pub fn label(&self) -> &'static str {
    match self {
      MetricType::Latency => "Latency [ms]",
      MetricType::Jitter => "Jitter [ms]",
      MetricType::PacketLoss => "Packet loss [%]",
    }
  }

  /// Cycle order used by the metric selector.
  pub fn next(self) -> Self {
    match self {
      MetricType::Latency => MetricType::Jitter,
      MetricType::Jitter => MetricType::PacketLoss,
      MetricType::PacketLoss => MetricType::Latency,
    }
  }
}

/// A single from→to reading of one metric, together with the health verdict
/// the upstream attached to it.
#[derive(Debug, Clone, Default)]
pub struct Metric {
  pub health: String,
  pub value: MetricValue,
}

/// One entry of a connection's health time series.
#[derive(Debug, Clone)]
pub struct HealthItem {
  pub jitter_millisec: MetricValue,
  pub latency_millisec: MetricValue,
  pub packet_loss_percent: MetricValue,
  pub time: DateTime<Utc>,
}

impl HealthItem {
  pub fn value_of(&self, metric: MetricType) -> MetricValue {
    match metric {
      MetricType::Latency => self.latency_millisec,
      MetricType::Jitter => self.jitter_millisec,
      MetricType::PacketLoss => self.packet_loss_percent,
    }
  }
}

/// The "to" endpoint of a connection: the most recent metrics plus the time
/// series they were derived from.
#[derive(Debug, Clone, Default)]
pub struct MeshColumn {
  pub agent_id: AgentId,
  pub jitter_millisec: Metric,
  pub latency_millisec: Metric,
  pub packet_loss_percent: Metric,
  pub health: Vec<HealthItem>,
}

impl MeshColumn {
  /// Total packet loss or an empty time series means the connection carries
  /// no usable measurement.
  pub fn has_no_data(&self) -> bool {
    self.packet_loss_percent.value >= 100.0 || self.health.is_empty()
  }

  pub fn value_of(&self, metric: MetricType) -> MetricValue {
    match metric {
      MetricType::Latency => self.latency_millisec.value,
      MetricType::Jitter => self.jitter_millisec.value,
      MetricType::PacketLoss => self.packet_loss_percent.value,
    }
  }
}

/// The "from" endpoint of a connection and its measurements towards every
/// other agent. Columns are kept sorted by agent id.
#[derive(Debug, Clone)]
pub struct MeshRow {
  pub agent_id: AgentId,
  pub columns: Vec<MeshColumn>,
}

impl MeshRow {
  pub fn new(agent_id: AgentId, mut columns: Vec<MeshColumn>) -> Self {
    columns.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
    Self { agent_id, columns }
  }
}

/// A timestamped snapshot of mesh test results.
///
/// `Default` is the "never updated" snapshot: no rows and a Unix-epoch
/// timestamp, guaranteed older than any positive max age.
#[derive(Debug, Clone)]
pub struct MeshResults {
  pub utc_timestamp: DateTime<Utc>,
  pub rows: Vec<MeshRow>,
  pub agents: Agents,
  row_index: HashMap<AgentId, usize>,
}

impl MeshResults {
  pub fn new(utc_timestamp: DateTime<Utc>, mut rows: Vec<MeshRow>, agents: Agents) -> Self {
    rows.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
    let row_index = rows
      .iter()
      .enumerate()
      .map(|(index, row)| (row.agent_id.clone(), index))
      .collect();
    Self {
      utc_timestamp,
      rows,
      agents,
      row_index,
    }
  }

  /// Connection metrics measured from `from_agent` towards `to_agent`.
  pub fn connection(&self, from_agent: &str, to_agent: &str) -> Option<&MeshColumn> {
    let row = &self.rows[*self.row_index.get(from_agent)?];
    row
      .columns
      .binary_search_by(|column| column.agent_id.as_str().cmp(to_agent))
      .ok()
      .map(|index| &row.columns[index])
  }

  /// Time series of a single metric for one connection, oldest first.
  pub fn filter(
    &self,
    from_agent: &str,
    to_agent: &str,
    metric: MetricType,
  ) -> Vec<(DateTime<Utc>, MetricValue)> {
    let Some(column) = self.connection(from_agent, to_agent) else {
      return Vec::new();
    };
    column
      .health
      .iter()
      .map(|item| (item.time, item.value_of(metric)))
      .collect()
  }

  /// Agent ids on the matrix axes, in row order.
  pub fn agent_ids(&self) -> Vec<AgentId> {
    self.rows.iter().map(|row| row.agent_id.clone()).collect()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

impl Default for MeshResults {
  fn default() -> Self {
    Self::new(DateTime::UNIX_EPOCH, Vec::new(), Agents::new())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn column(agent_id: &str, latency: MetricValue) -> MeshColumn {
    MeshColumn {
      agent_id: agent_id.to_string(),
      latency_millisec: Metric {
        health: "healthy".to_string(),
        value: latency,
      },
      jitter_millisec: Metric {
        health: "healthy".to_string(),
        value: latency / 10.0,
      },
      packet_loss_percent: Metric::default(),
      health: vec![HealthItem {
        jitter_millisec: latency / 10.0,
        latency_millisec: latency,
        packet_loss_percent: 0.0,
        time: Utc::now(),
      }],
    }
  }

  fn results() -> MeshResults {
    let rows = vec![
      MeshRow::new("20".to_string(), vec![column("30", 5.0), column("10", 2.0)]),
      MeshRow::new("10".to_string(), vec![column("20", 1.0), column("30", 3.0)]),
    ];
    MeshResults::new(Utc::now(), rows, Agents::new())
  }

  #[test]
  fn test_rows_and_columns_sorted_by_agent_id() {
    let results = results();
    assert_eq!(results.rows[0].agent_id, "10");
    assert_eq!(results.rows[1].agent_id, "20");
    assert_eq!(results.rows[1].columns[0].agent_id, "10");
    assert_eq!(results.rows[1].columns[1].agent_id, "30");
  }

  #[test]
  fn test_connection_lookup() {
    let results = results();
    let connection = results.connection("10", "30").expect("connection missing");
    assert_eq!(connection.latency_millisec.value, 3.0);

    assert!(results.connection("10", "99").is_none());
    assert!(results.connection("99", "10").is_none());
  }

  #[test]
  fn test_filter_projects_selected_metric() {
    let results = results();
    let series = results.filter("20", "30", MetricType::Latency);
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].1, 5.0);

    let series = results.filter("20", "30", MetricType::Jitter);
    assert_eq!(series[0].1, 0.5);

    assert!(results.filter("20", "99", MetricType::Latency).is_empty());
  }

  #[test]
  fn test_has_no_data() {
    let mut full_loss = column("30", 5.0);
    full_loss.packet_loss_percent.value = 100.0;
    assert!(full_loss.has_no_data());

    let mut no_series = column("30", 5.0);
    no_series.health.clear();
    assert!(no_series.has_no_data());

    assert!(!column("30", 5.0).has_no_data());
  }

  #[test]
  fn test_agent_label_fallbacks() {
    let mut agents = Agents::new();
    agents.insert(Agent {
      id: "10".to_string(),
      alias: "warsaw-dc".to_string(),
      name: "agent-10".to_string(),
      ..Agent::default()
    });
    agents.insert(Agent {
      id: "20".to_string(),
      name: "agent-20".to_string(),
      ..Agent::default()
    });

    assert_eq!(agents.label("10"), "warsaw-dc");
    assert_eq!(agents.label("20"), "agent-20");
    assert_eq!(agents.label("99"), "[99]");
  }

  #[test]
  fn test_default_is_sentinel_snapshot() {
    let results = MeshResults::default();
    assert!(results.is_empty());
    assert_eq!(results.utc_timestamp, DateTime::UNIX_EPOCH);
  }
}
