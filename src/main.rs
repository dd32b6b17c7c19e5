mod address;
mod app;
mod cache;
mod cli;
mod commands;
mod config;
mod corporate;
mod event;
mod kenall;
mod logging;
mod paging;
mod query;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use kenall::SearchMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kenall")]
#[command(about = "Terminal UI and CLI for the KEN_ALL postal code and corporate number API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/kenall/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Look up the addresses of a postal code
  Lookup {
    /// Postal code, with or without hyphen
    postal: String,
  },
  /// Find postal codes for an address
  Search {
    address: String,
    /// Maximum number of candidates
    #[arg(short, long)]
    limit: Option<u64>,
  },
  /// Search the corporate number registry
  Corp {
    /// Corporate name (matched against name and furigana)
    name: String,
    #[arg(short, long)]
    prefecture: Option<String>,
    /// Kind code, e.g. 301 for 株式会社
    #[arg(short, long)]
    kind: Option<String>,
    #[arg(short, long, value_enum, default_value_t = SearchMode::Partial)]
    mode: SearchMode,
    /// Number of rows to print
    #[arg(short, long, default_value_t = 10)]
    rows: u64,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;

  let Some(command) = args.command else {
    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = logging::init_file()?;
    let mut app = app::App::new(config)?;
    return app.run().await;
  };

  logging::init_stderr()?;
  match command {
    Commands::Lookup { postal } => cli::lookup(&config, &postal).await,
    Commands::Search { address, limit } => cli::search(&config, &address, limit).await,
    Commands::Corp {
      name,
      prefecture,
      kind,
      mode,
      rows,
    } => {
      let args = cli::CorpArgs {
        name,
        prefecture,
        kind,
        mode,
        rows,
      };
      cli::corp(&config, args).await
    }
  }
}
