//! Cached access to mesh test results.

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use color_eyre::Result;
use tracing::debug;

use crate::cache::RequestDrivenCache;
use crate::config::Config;

use super::agents_cache::AgentDirectoryCache;
use super::client::MeshApiClient;
use super::types::{AgentId, Agents, MeshResults};

/// Mesh results source with transparent request-driven caching.
///
/// Wraps the API client and keeps the latest results snapshot: a read older
/// than the configured max age refreshes it from upstream, an upstream
/// failure falls back to the cached snapshot. From the caller's point of
/// view `mesh_results` never fails.
pub struct CachedMeshSource {
  client: MeshApiClient,
  test_id: String,
  lookback_seconds: i64,
  results: RequestDrivenCache<MeshResults>,
  agents: AgentDirectoryCache,
}

impl CachedMeshSource {
  pub fn new(client: MeshApiClient, config: &Config) -> Self {
    Self {
      client,
      test_id: config.test_id.clone(),
      lookback_seconds: config.data_lookback_seconds,
      results: RequestDrivenCache::new(Duration::seconds(config.max_measurement_age_seconds)),
      agents: AgentDirectoryCache::new(),
    }
  }

  /// The latest mesh results, refreshed first when older than the max age.
  pub async fn mesh_results(&self) -> MeshResults {
    self.results.get(|| self.fetch_results()).await
  }

  async fn fetch_results(&self) -> Result<MeshResults> {
    let rows = self
      .client
      .health_rows(&self.test_id, self.lookback_seconds)
      .await?;

    // Agent metadata comes from the directory cache, which only hits the
    // listing endpoint when the rows mention an agent it has not seen yet.
    let mut required: BTreeSet<AgentId> = BTreeSet::new();
    for row in &rows {
      required.insert(row.agent_id.clone());
      for column in &row.columns {
        required.insert(column.agent_id.clone());
      }
    }

    let directory = self
      .agents
      .get_for(&required, || self.client.list_agents())
      .await;

    let mut agents = Agents::new();
    for agent in directory.into_values() {
      agents.insert(agent);
    }

    debug!(
      "mesh results fetched: {} rows, {} known agents",
      rows.len(),
      agents.count()
    );
    Ok(MeshResults::new(Utc::now(), rows, agents))
  }
}
