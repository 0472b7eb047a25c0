use crate::config::Config;
use crate::mesh::api_types::{ApiAgent, ApiAgentsResponse, ApiHealthRequest, ApiHealthResponse};
use crate::mesh::types::{Agent, MeshRow};
use chrono::{Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use url::Url;

const AUTH_EMAIL_HEADER: &str = "X-CH-Auth-Email";
const AUTH_TOKEN_HEADER: &str = "X-CH-Auth-API-Token";

/// Monitoring API client wrapper
#[derive(Clone)]
pub struct MeshApiClient {
  http: reqwest::Client,
  base_url: Url,
  email: String,
  token: String,
}

impl MeshApiClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;

    let mut base_url = Url::parse(&config.api.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.api.url, e))?;
    // Url::join replaces the last path segment unless the base ends in '/'
    if !base_url.path().ends_with('/') {
      base_url.set_path(&format!("{}/", base_url.path()));
    }

    let http = reqwest::Client::builder()
      .timeout(std::time::Duration::from_secs(config.timeout_seconds))
      .gzip(true)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      email: config.api.email.clone(),
      token,
    })
  }

  /// Fetch mesh health for a test over the lookback window and return the
  /// most recent snapshot's rows.
  pub async fn health_rows(&self, test_id: &str, lookback_seconds: i64) -> Result<Vec<MeshRow>> {
    let end_time = Utc::now();
    let start_time = end_time - Duration::seconds(lookback_seconds);
    let request = ApiHealthRequest {
      ids: vec![test_id.to_string()],
      start_time,
      end_time,
      augment: true,
    };

    let response: ApiHealthResponse = self
      .http
      .post(self.endpoint("health/tests")?)
      .header(AUTH_EMAIL_HEADER, self.email.as_str())
      .header(AUTH_TOKEN_HEADER, self.token.as_str())
      .json(&request)
      .send()
      .await
      .map_err(|e| eyre!("Health request failed for test {}: {}", test_id, e))?
      .error_for_status()
      .map_err(|e| eyre!("Health request rejected for test {}: {}", test_id, e))?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse health response for test {}: {}", test_id, e))?;

    // No measurements in the window happens right after a mesh test was
    // started or paused; there is nothing to render from it.
    let most_recent = response
      .health
      .into_iter()
      .next_back()
      .ok_or_else(|| eyre!("No mesh results for test {} in the requested window", test_id))?;

    most_recent.mesh.into_iter().map(|row| row.into_row()).collect()
  }

  /// Fetch the full agent directory.
  pub async fn list_agents(&self) -> Result<Vec<Agent>> {
    let response: ApiAgentsResponse = self
      .http
      .get(self.endpoint("agents")?)
      .header(AUTH_EMAIL_HEADER, self.email.as_str())
      .header(AUTH_TOKEN_HEADER, self.token.as_str())
      .send()
      .await
      .map_err(|e| eyre!("Agent listing failed: {}", e))?
      .error_for_status()
      .map_err(|e| eyre!("Agent listing rejected: {}", e))?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse agent listing: {}", e))?;

    Ok(response.agents.into_iter().map(ApiAgent::into_agent).collect())
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }
}
