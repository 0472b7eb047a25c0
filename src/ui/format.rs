use chrono::{DateTime, Local, Utc};

use crate::mesh::types::{MetricType, MetricValue};

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Format a metric value the way the matrix cells show it
pub fn format_value(value: MetricValue, metric: MetricType) -> String {
  match metric {
    MetricType::Latency | MetricType::Jitter => format!("{value:.2}"),
    MetricType::PacketLoss => format!("{value:.1}"),
  }
}

/// Render a results timestamp in local time. The epoch sentinel means no
/// refresh has succeeded yet.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
  if timestamp == DateTime::UNIX_EPOCH {
    return "never".to_string();
  }
  timestamp
    .with_timezone(&Local)
    .format("%Y-%m-%d %H:%M:%S")
    .to_string()
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.len() <= max_len {
    s.to_string()
  } else {
    format!("{}...", &s[..max_len.saturating_sub(3)])
  }
}

/// Scale the most recent `width` samples to an 8-level sparkline
pub fn sparkline(values: &[MetricValue], width: usize) -> String {
  if values.is_empty() || width == 0 {
    return String::new();
  }

  let tail = &values[values.len().saturating_sub(width)..];
  let max = tail.iter().cloned().fold(0.0, f64::max);
  if max <= 0.0 {
    return tail.iter().map(|_| SPARKLINE_CHARS[0]).collect();
  }

  tail
    .iter()
    .map(|value| {
      let level = ((value / max) * 7.0).round() as usize;
      SPARKLINE_CHARS[level.min(7)]
    })
    .collect()
}
