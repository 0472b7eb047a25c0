mod app;
mod cache;
mod config;
mod event;
mod mesh;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "meshtop")]
#[command(about = "A terminal dashboard for network mesh test results")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/meshtop/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Mesh test ID to display (overrides the config file)
  #[arg(short, long)]
  test_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // The app owns the terminal, so logs go to a file
  let _log_guard = init_logging()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override the test if specified on the command line
  let config = if let Some(test_id) = args.test_id {
    config::Config { test_id, ..config }
  } else {
    config
  };

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .map(|p| p.join("meshtop"))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::never(&log_dir, "meshtop.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meshtop=info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}
