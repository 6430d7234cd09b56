//! Tracing setup.
//!
//! The terminal front-end owns stdout, so it logs to a file; the proxy logs to
//! stdout. Both honour `RUST_LOG` and default to `info`.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config;

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to `vidscout.log` in the data directory. Keep the guard alive for the
/// lifetime of the program or buffered lines are lost.
pub fn init_file() -> Result<WorkerGuard> {
  let dir = config::data_dir();
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;
  let appender = tracing_appender::rolling::never(&dir, "vidscout.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  tracing_subscriber::fmt()
    .with_env_filter(env_filter())
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| anyhow::anyhow!(e))
    .context("Failed to install file logger")?;
  Ok(guard)
}

pub fn init_stdout() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(env_filter())
    .try_init()
    .map_err(|e| anyhow::anyhow!(e))
    .context("Failed to install stdout logger")
}
