mod api;
mod cache;
mod cli;
mod config;
mod logging;
mod transport;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::QueryStore;
use crate::transport::HttpTransport;

#[derive(Parser, Debug)]
#[command(name = "pressroom")]
#[command(about = "Admin client for the blog and travel-places backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pressroom/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Backend root URL, overriding the config file
  #[arg(long, global = true, env = config::BASE_URL_ENV)]
  base_url: Option<String>,

  /// Mirror logs to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Print results as JSON
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: cli::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = logging::init(args.verbose)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?.with_base_url(args.base_url);
  let base_url = config.base_url()?;
  info!(base_url = %base_url, "starting");

  let transport = HttpTransport::new(base_url, config.timeout())?;
  let store = QueryStore::new(Arc::new(transport), config.cache_settings());

  let result = cli::run(args.command, &store, args.json).await;

  if !store.is_empty() {
    debug!(entries = store.len(), "dropping cached entries");
    store.clear();
  }

  result
}
