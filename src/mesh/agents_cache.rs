//! Need-driven cache for the agent directory.

use color_eyre::Result;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use super::types::{Agent, AgentId};

/// Caches the agent directory and refreshes it only when a lookup requires
/// an agent that is not cached yet: staleness is coverage-based, not
/// time-based.
///
/// A refresh replaces the whole directory with a fresh listing, never a
/// merge, so agents removed upstream disappear here as well and the
/// replacement is visible to every subsequent caller.
#[derive(Default)]
pub struct AgentDirectoryCache {
  directory: Mutex<HashMap<AgentId, Agent>>,
  /// Same single-flight discipline as `RequestDrivenCache`: serializes
  /// refreshers, never held together with `directory`.
  refresh: tokio::sync::Mutex<()>,
}

impl AgentDirectoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Look up metadata for the `required` agents, refreshing the directory
  /// first when any of them is missing. Ids unknown to the upstream are
  /// silently absent from the result; listing failures are logged and the
  /// current directory is served as-is.
  pub async fn get_for<F, Fut>(
    &self,
    required: &BTreeSet<AgentId>,
    list_agents: F,
  ) -> HashMap<AgentId, Agent>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<Agent>>>,
  {
    if self.covers(required) {
      return self.subset(required);
    }

    let _refreshing = self.refresh.lock().await;

    // A concurrent refresh may have filled in the missing agents already.
    if self.covers(required) {
      return self.subset(required);
    }

    match list_agents().await {
      Ok(listing) => {
        debug!("replacing agent directory with {} agents", listing.len());
        let fresh: HashMap<AgentId, Agent> = listing
          .into_iter()
          .map(|agent| (agent.id.clone(), agent))
          .collect();
        *self.lock_directory() = fresh;
      }
      Err(err) => warn!("agent directory refresh failed, serving current entries: {err:#}"),
    }

    self.subset(required)
  }

  fn covers(&self, required: &BTreeSet<AgentId>) -> bool {
    let directory = self.lock_directory();
    required.iter().all(|id| directory.contains_key(id))
  }

  fn subset(&self, required: &BTreeSet<AgentId>) -> HashMap<AgentId, Agent> {
    let directory = self.lock_directory();
    required
      .iter()
      .filter_map(|id| directory.get(id).map(|agent| (id.clone(), agent.clone())))
      .collect()
  }

  fn lock_directory(&self) -> std::sync::MutexGuard<'_, HashMap<AgentId, Agent>> {
    self.directory.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use color_eyre::eyre::eyre;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn agent(id: &str) -> Agent {
    Agent {
      id: id.to_string(),
      alias: format!("alias-{id}"),
      ..Agent::default()
    }
  }

  fn required(ids: &[&str]) -> BTreeSet<AgentId> {
    ids.iter().map(|id| id.to_string()).collect()
  }

  #[tokio::test]
  async fn test_missing_id_triggers_one_refresh_and_is_omitted_when_unknown() {
    let cache = AgentDirectoryCache::new();
    let listings = AtomicUsize::new(0);

    // Upstream knows A and C; B is required but does not exist.
    let result = cache
      .get_for(&required(&["A", "B"]), || async {
        listings.fetch_add(1, Ordering::SeqCst);
        Ok(vec![agent("A"), agent("C")])
      })
      .await;

    assert_eq!(listings.load(Ordering::SeqCst), 1);
    assert_eq!(result.len(), 1);
    assert_eq!(result["A"].alias, "alias-A");

    // Everything required is now cached; no further listing.
    let result = cache
      .get_for(&required(&["A"]), || async {
        listings.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
      })
      .await;

    assert_eq!(listings.load(Ordering::SeqCst), 1);
    assert_eq!(result.len(), 1);
  }

  #[tokio::test]
  async fn test_empty_required_set_never_refreshes() {
    let cache = AgentDirectoryCache::new();
    let listings = AtomicUsize::new(0);

    let result = cache
      .get_for(&BTreeSet::new(), || async {
        listings.fetch_add(1, Ordering::SeqCst);
        Ok(vec![agent("A")])
      })
      .await;

    assert!(result.is_empty());
    assert_eq!(listings.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_refresh_replaces_directory_wholesale() {
    let cache = AgentDirectoryCache::new();

    cache
      .get_for(&required(&["A", "B"]), || async {
        Ok(vec![agent("A"), agent("B")])
      })
      .await;

    // B disappeared upstream; asking for C forces a replacement that also
    // drops B for every later caller.
    cache
      .get_for(&required(&["C"]), || async {
        Ok(vec![agent("A"), agent("C")])
      })
      .await;

    let listings = AtomicUsize::new(0);
    let result = cache
      .get_for(&required(&["B"]), || async {
        listings.fetch_add(1, Ordering::SeqCst);
        Ok(vec![agent("A"), agent("C")])
      })
      .await;

    assert!(result.is_empty());
    assert_eq!(listings.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_listing_failure_serves_current_entries() {
    let cache = AgentDirectoryCache::new();

    cache
      .get_for(&required(&["A"]), || async { Ok(vec![agent("A")]) })
      .await;

    let result = cache
      .get_for(&required(&["A", "B"]), || async { Err(eyre!("listing down")) })
      .await;

    assert_eq!(result.len(), 1);
    assert!(result.contains_key("A"));
  }
}
