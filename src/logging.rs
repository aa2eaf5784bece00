//! Tracing setup: a daily log file, optionally mirrored to stderr.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "PRESSROOM_LOG";

const DEFAULT_FILTER: &str = "pressroom=info";

/// Directory for log files: `$XDG_DATA_HOME/pressroom/logs`, or `./logs`.
pub fn log_dir() -> PathBuf {
  dirs::data_dir()
    .map(|d| d.join("pressroom").join("logs"))
    .unwrap_or_else(|| PathBuf::from("logs"))
}

fn filter() -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the rest of `main`.
pub fn init(verbose: bool) -> Result<WorkerGuard> {
  let dir = log_dir();
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "pressroom.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let file_layer = fmt::layer()
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true)
    .with_filter(filter());

  let stderr_layer = verbose.then(|| {
    fmt::layer()
      .with_writer(std::io::stderr)
      .compact()
      .with_filter(filter())
  });

  tracing_subscriber::registry()
    .with(file_layer)
    .with(stderr_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok(guard)
}
