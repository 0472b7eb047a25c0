//! Wire-format types for the monitoring API and their transformation into
//! the domain model.
//!
//! The API reports latency and jitter in microseconds and packet loss as a
//! 0..1 fraction, all as strings; everything is rescaled here so the rest of
//! the code only sees milliseconds and percent.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

use super::types::{Agent, Coordinates, HealthItem, MeshColumn, MeshRow, Metric, MetricValue};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealthRequest {
  pub ids: Vec<String>,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub augment: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApiHealthResponse {
  /// One entry per measurement window; the last one is the most recent.
  /// Empty right after a test was started or resumed.
  #[serde(default)]
  pub health: Vec<ApiTestHealth>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTestHealth {
  #[serde(default)]
  pub mesh: Vec<ApiMeshRow>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMeshRow {
  pub id: String,
  #[serde(default)]
  pub columns: Vec<ApiMeshColumn>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMeshColumn {
  pub id: String,
  pub metrics: ApiMetrics,
  #[serde(default)]
  pub health: Vec<ApiHealthItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMetrics {
  pub latency: ApiMetric,
  pub jitter: ApiMetric,
  #[serde(rename = "packetLoss")]
  pub packet_loss: ApiMetric,
}

#[derive(Debug, Deserialize)]
pub struct ApiMetric {
  #[serde(default)]
  pub health: String,
  pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiHealthItem {
  pub time: DateTime<Utc>,
  pub latency: ApiMetric,
  pub jitter: ApiMetric,
  #[serde(rename = "packetLoss")]
  pub packet_loss: ApiMetric,
}

#[derive(Debug, Deserialize)]
pub struct ApiAgentsResponse {
  #[serde(default)]
  pub agents: Vec<ApiAgent>,
}

#[derive(Debug, Deserialize)]
pub struct ApiAgent {
  pub id: String,
  #[serde(default)]
  pub ip: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub alias: String,
  #[serde(default)]
  pub long: f64,
  #[serde(default)]
  pub lat: f64,
}

impl ApiMeshRow {
  pub fn into_row(self) -> Result<MeshRow> {
    let columns = self
      .columns
      .into_iter()
      .map(ApiMeshColumn::into_column)
      .collect::<Result<Vec<_>>>()?;
    Ok(MeshRow::new(self.id, columns))
  }
}

impl ApiMeshColumn {
  fn into_column(self) -> Result<MeshColumn> {
    let health = self
      .health
      .into_iter()
      .map(ApiHealthItem::into_item)
      .collect::<Result<Vec<_>>>()?;
    Ok(MeshColumn {
      agent_id: self.id,
      latency_millisec: Metric {
        health: self.metrics.latency.health,
        value: scale_us_to_ms(&self.metrics.latency.value)?,
      },
      jitter_millisec: Metric {
        health: self.metrics.jitter.health,
        value: scale_us_to_ms(&self.metrics.jitter.value)?,
      },
      packet_loss_percent: Metric {
        health: self.metrics.packet_loss.health,
        value: scale_to_percents(&self.metrics.packet_loss.value)?,
      },
      health,
    })
  }
}

impl ApiHealthItem {
  fn into_item(self) -> Result<HealthItem> {
    Ok(HealthItem {
      latency_millisec: scale_us_to_ms(&self.latency.value)?,
      jitter_millisec: scale_us_to_ms(&self.jitter.value)?,
      packet_loss_percent: scale_to_percents(&self.packet_loss.value)?,
      time: self.time,
    })
  }
}

impl ApiAgent {
  pub fn into_agent(self) -> Agent {
    Agent {
      id: self.id,
      ip: self.ip,
      name: self.name,
      alias: self.alias,
      coords: Coordinates {
        long: self.long,
        lat: self.lat,
      },
    }
  }
}

fn parse_value(value: &str) -> Result<MetricValue> {
  value
    .parse::<MetricValue>()
    .map_err(|_| eyre!("Invalid metric value: {value:?}"))
}

fn scale_us_to_ms(value: &str) -> Result<MetricValue> {
  Ok(parse_value(value)? / 1000.0)
}

/// Scale a 0..1 fraction to 0..100 percent.
fn scale_to_percents(value: &str) -> Result<MetricValue> {
  Ok(parse_value(value)? * 100.0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_scaling() {
    assert_eq!(scale_us_to_ms("2500").unwrap(), 2.5);
    assert_eq!(scale_to_percents("0.05").unwrap(), 5.0);
    assert!(scale_us_to_ms("n/a").is_err());
  }

  #[test]
  fn test_health_response_transforms_into_rows() {
    let payload = serde_json::json!({
      "health": [{
        "mesh": [{
          "id": "10",
          "columns": [{
            "id": "20",
            "metrics": {
              "latency": {"health": "healthy", "value": "2500"},
              "jitter": {"health": "healthy", "value": "300"},
              "packetLoss": {"health": "warning", "value": "0.02"}
            },
            "health": [{
              "time": "2021-06-01T12:00:00Z",
              "latency": {"value": "2500"},
              "jitter": {"value": "300"},
              "packetLoss": {"value": "0.02"}
            }]
          }]
        }]
      }]
    });

    let response: ApiHealthResponse = serde_json::from_value(payload).unwrap();
    assert_eq!(response.health.len(), 1);

    let snapshot = response.health.into_iter().next().unwrap();
    let row = snapshot.mesh.into_iter().next().unwrap().into_row().unwrap();
    assert_eq!(row.agent_id, "10");

    let column = &row.columns[0];
    assert_eq!(column.agent_id, "20");
    assert_eq!(column.latency_millisec.value, 2.5);
    assert_eq!(column.jitter_millisec.value, 0.3);
    assert_eq!(column.packet_loss_percent.value, 2.0);
    assert_eq!(column.packet_loss_percent.health, "warning");
    assert_eq!(column.health.len(), 1);
    assert_eq!(column.health[0].latency_millisec, 2.5);
  }

  #[test]
  fn test_bad_metric_value_is_an_error() {
    let row = ApiMeshRow {
      id: "10".to_string(),
      columns: vec![ApiMeshColumn {
        id: "20".to_string(),
        metrics: ApiMetrics {
          latency: ApiMetric {
            health: String::new(),
            value: "not-a-number".to_string(),
          },
          jitter: ApiMetric {
            health: String::new(),
            value: "0".to_string(),
          },
          packet_loss: ApiMetric {
            health: String::new(),
            value: "0".to_string(),
          },
        },
        health: Vec::new(),
      }],
    };

    assert!(row.into_row().is_err());
  }

  #[test]
  fn test_agent_listing_transforms() {
    let payload = serde_json::json!({
      "agents": [
        {"id": "10", "ip": "10.0.0.1", "name": "agent-10", "alias": "warsaw-dc", "long": 21.0, "lat": 52.2},
        {"id": "20"}
      ]
    });

    let response: ApiAgentsResponse = serde_json::from_value(payload).unwrap();
    let agents: Vec<Agent> = response.agents.into_iter().map(ApiAgent::into_agent).collect();

    assert_eq!(agents[0].alias, "warsaw-dc");
    assert_eq!(agents[0].coords.lat, 52.2);
    assert_eq!(agents[1].id, "20");
    assert!(agents[1].ip.is_empty());
  }
}
