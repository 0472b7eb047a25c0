use crate::cache::RateLimiter;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::mesh::cached_source::CachedMeshSource;
use crate::mesh::client::MeshApiClient;
use crate::mesh::types::{AgentId, MeshResults, MetricType};
use crate::ui;
use chrono::{Duration as ChronoDuration, Utc};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;

/// Single trigger site, so the limiter runs on its default key.
const REFRESH_KEY: &str = "";

/// View state - each variant owns its navigation data
#[derive(Debug)]
pub enum ViewState {
  /// Agent-to-agent matrix, the root view
  Matrix {
    /// (from-axis, to-axis) indices into the result's agent list
    selected: (usize, usize),
  },
  /// Time-series detail for a single connection (pushed via Enter)
  Connection {
    from_agent: AgentId,
    to_agent: AgentId,
  },
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<ViewState>,

  /// Metric currently shown in the matrix
  metric: MetricType,

  /// Latest snapshot delivered by the cached source
  results: MeshResults,

  /// Whether a background refresh task is in flight
  refreshing: bool,

  /// Application configuration
  config: Config,

  /// Cached mesh results source
  source: Arc<CachedMeshSource>,

  /// Throttles how often a tick may trigger the source at all
  limiter: RateLimiter,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = MeshApiClient::new(&config)?;
    let source = Arc::new(CachedMeshSource::new(client, &config));
    let limiter = RateLimiter::new(Duration::from_secs(config.data_request_interval_seconds));
    let (tx, _rx) = mpsc::unbounded_channel();

    Ok(Self {
      view_stack: vec![ViewState::Matrix { selected: (0, 0) }],
      metric: config.default_metric,
      results: MeshResults::default(),
      refreshing: false,
      config,
      source,
      limiter,
      event_tx: tx,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    // First paint should not wait for the limiter window
    self.trigger_refresh();

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.maybe_refresh(),
      Event::Results(results) => {
        self.results = *results;
        self.refreshing = false;
        self.clamp_selection();
      }
    }
  }

  /// Ask the rate limiter whether this tick may poll the source. The cache's
  /// own max age then decides whether an upstream call actually happens.
  fn maybe_refresh(&mut self) {
    if self.limiter.check_and_update(REFRESH_KEY) {
      self.trigger_refresh();
    } else {
      trace!(
        "refresh trigger denied; interval {:?} not elapsed",
        self.limiter.interval()
      );
    }
  }

  fn trigger_refresh(&mut self) {
    if self.refreshing {
      return;
    }
    self.refreshing = true;

    let source = Arc::clone(&self.source);
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let results = source.mesh_results().await;
      let _ = tx.send(Event::Results(Box::new(results)));
    });
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match key.code {
      // Quit
      KeyCode::Char('q') => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }
      KeyCode::Esc => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        }
      }

      // Metric selector
      KeyCode::Char('m') | KeyCode::Tab => {
        self.metric = self.metric.next();
      }

      // Manual refresh: skips the limiter, still bounded by the cache
      KeyCode::Char('r') => self.trigger_refresh(),

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1, 0),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1, 0),
      KeyCode::Left | KeyCode::Char('h') => self.move_selection(0, -1),
      KeyCode::Right | KeyCode::Char('l') => self.move_selection(0, 1),
      KeyCode::Enter => self.enter_selected(),

      _ => {}
    }
  }

  fn move_selection(&mut self, row_delta: i32, column_delta: i32) {
    let axis_len = self.results.rows.len();
    if axis_len == 0 {
      return;
    }
    if let Some(ViewState::Matrix { selected }) = self.view_stack.last_mut() {
      let (row, column) = *selected;
      *selected = (
        (row as i32 + row_delta).rem_euclid(axis_len as i32) as usize,
        (column as i32 + column_delta).rem_euclid(axis_len as i32) as usize,
      );
    }
  }

  fn enter_selected(&mut self) {
    let Some(ViewState::Matrix { selected }) = self.view_stack.last() else {
      return;
    };
    let axis = self.results.agent_ids();
    let (Some(from_agent), Some(to_agent)) = (axis.get(selected.0), axis.get(selected.1)) else {
      return;
    };
    // The diagonal has no connection to look at
    if from_agent == to_agent {
      return;
    }
    self.view_stack.push(ViewState::Connection {
      from_agent: from_agent.clone(),
      to_agent: to_agent.clone(),
    });
  }

  /// Keep the matrix selection valid when a refresh changes the agent set
  fn clamp_selection(&mut self) {
    let axis_len = self.results.rows.len();
    if let Some(ViewState::Matrix { selected }) = self.view_stack.first_mut() {
      if axis_len == 0 {
        *selected = (0, 0);
      } else {
        selected.0 = selected.0.min(axis_len - 1);
        selected.1 = selected.1.min(axis_len - 1);
      }
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&ViewState> {
    self.view_stack.last()
  }

  pub fn results(&self) -> &MeshResults {
    &self.results
  }

  pub fn metric(&self) -> MetricType {
    self.metric
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn is_refreshing(&self) -> bool {
    self.refreshing
  }

  /// The current snapshot is older than the configured max age (upstream
  /// failing or the first refresh still in flight)
  pub fn is_stale(&self) -> bool {
    Utc::now() - self.results.utc_timestamp
      > ChronoDuration::seconds(self.config.max_measurement_age_seconds)
  }
}
