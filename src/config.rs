use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::mesh::types::{AgentId, MetricType, MetricValue};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// ID of the mesh test to display the matrix for
  pub test_id: String,
  /// Serve cached results until they are older than this
  pub max_measurement_age_seconds: i64,
  /// Minimum interval between refresh triggers. This is to save request quota.
  pub data_request_interval_seconds: u64,
  /// How far back to ask the server for results
  pub data_lookback_seconds: i64,
  /// HTTP request timeout
  #[serde(default = "default_timeout_seconds")]
  pub timeout_seconds: u64,
  /// Metric shown when the dashboard starts
  #[serde(default)]
  pub default_metric: MetricType,
  pub thresholds: ThresholdsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the monitoring API
  pub url: String,
  /// Account email sent with every request. The API token comes from the
  /// MESHTOP_API_TOKEN environment variable, never from this file.
  pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsConfig {
  /// Latency thresholds, in milliseconds
  pub latency: Thresholds,
  /// Jitter thresholds, in milliseconds
  pub jitter: Thresholds,
  /// Packet loss thresholds, in percents (0-100)
  pub packet_loss: Thresholds,
}

impl ThresholdsConfig {
  pub fn for_metric(&self, metric: MetricType) -> &Thresholds {
    match metric {
      MetricType::Latency => &self.latency,
      MetricType::Jitter => &self.jitter,
      MetricType::PacketLoss => &self.packet_loss,
    }
  }
}

/// Warning/critical levels with optional per-connection overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
  pub defaults: ThresholdLevels,
  #[serde(default)]
  pub overrides: Vec<ThresholdOverride>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThresholdLevels {
  pub warning: MetricValue,
  pub critical: MetricValue,
}

/// Override for a single from→to connection; unset levels fall back to the
/// defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdOverride {
  pub from: AgentId,
  pub to: AgentId,
  pub warning: Option<MetricValue>,
  pub critical: Option<MetricValue>,
}

impl Thresholds {
  pub fn warning(&self, from_agent: &str, to_agent: &str) -> MetricValue {
    self
      .override_for(from_agent, to_agent)
      .and_then(|o| o.warning)
      .unwrap_or(self.defaults.warning)
  }

  pub fn critical(&self, from_agent: &str, to_agent: &str) -> MetricValue {
    self
      .override_for(from_agent, to_agent)
      .and_then(|o| o.critical)
      .unwrap_or(self.defaults.critical)
  }

  fn override_for(&self, from_agent: &str, to_agent: &str) -> Option<&ThresholdOverride> {
    self
      .overrides
      .iter()
      .find(|o| o.from == from_agent && o.to == to_agent)
  }
}

fn default_timeout_seconds() -> u64 {
  30
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./meshtop.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/meshtop/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/meshtop/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("meshtop.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("meshtop").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.max_measurement_age_seconds <= 0 {
      return Err(eyre!("max_measurement_age_seconds must be positive"));
    }
    if self.data_request_interval_seconds == 0 {
      return Err(eyre!("data_request_interval_seconds must be positive"));
    }
    if self.data_lookback_seconds <= 0 {
      return Err(eyre!("data_lookback_seconds must be positive"));
    }
    Ok(())
  }

  /// Get the API token from environment variables.
  ///
  /// Checks MESHTOP_API_TOKEN first, then MESH_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("MESHTOP_API_TOKEN")
      .or_else(|_| std::env::var("MESH_API_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set MESHTOP_API_TOKEN or MESH_API_TOKEN environment variable.")
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const MINIMAL_CONFIG: &str = r#"
api:
  url: https://synthetics.example.com/api/v1
  email: monitoring@example.com
test_id: "3541"
max_measurement_age_seconds: 60
data_request_interval_seconds: 30
data_lookback_seconds: 300
thresholds:
  latency:
    defaults: {warning: 200.0, critical: 400.0}
    overrides:
      - {from: "10", to: "20", critical: 1000.0}
  jitter:
    defaults: {warning: 30.0, critical: 80.0}
  packet_loss:
    defaults: {warning: 2.0, critical: 10.0}
"#;

  fn config() -> Config {
    serde_yaml::from_str(MINIMAL_CONFIG).unwrap()
  }

  #[test]
  fn test_parse_minimal_config() {
    let config = config();
    assert_eq!(config.test_id, "3541");
    assert_eq!(config.timeout_seconds, 30);
    assert_eq!(config.default_metric, MetricType::Latency);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_threshold_override_lookup() {
    let config = config();
    let latency = &config.thresholds.latency;

    // Partial override: warning falls back to the default
    assert_eq!(latency.warning("10", "20"), 200.0);
    assert_eq!(latency.critical("10", "20"), 1000.0);

    // Overrides are directional
    assert_eq!(latency.critical("20", "10"), 400.0);
    assert_eq!(latency.critical("10", "30"), 400.0);
  }

  #[test]
  fn test_validate_rejects_nonpositive_intervals() {
    let mut bad = config();
    bad.max_measurement_age_seconds = 0;
    assert!(bad.validate().is_err());

    let mut bad = config();
    bad.data_request_interval_seconds = 0;
    assert!(bad.validate().is_err());

    let mut bad = config();
    bad.data_lookback_seconds = -1;
    assert!(bad.validate().is_err());
  }
}
