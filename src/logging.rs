use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FILTER_ENV: &str = "KENALL_LOG";
const DEFAULT_FILTER: &str = "kenall=info";

fn filter() -> EnvFilter {
  EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Directory holding the daily log files: `$XDG_DATA_HOME/kenall/logs`.
pub fn log_dir() -> Option<PathBuf> {
  dirs::data_dir().map(|dir| dir.join("kenall").join("logs"))
}

/// Log to a daily file. The terminal belongs to the UI while it runs.
///
/// Keep the returned guard alive until exit; dropping it flushes the writer.
pub fn init_file() -> Result<Option<WorkerGuard>> {
  let Some(dir) = log_dir() else {
    return Ok(None);
  };
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "kenall.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(filter())
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(Some(guard))
}

/// Log to stderr for the non-interactive subcommands.
pub fn init_stderr() -> Result<()> {
  tracing_subscriber::registry()
    .with(filter())
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))
}
