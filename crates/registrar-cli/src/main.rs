//! `registrar`: command-line access to the identity registry.
//!
//! Reads `registrar.toml` (or the path given with `--config`), overlays
//! `REGISTRAR_*` environment variables, opens the SQLite store and runs one
//! command. Results are printed to stdout as JSON; logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! registrar person create --unique-id STU202600001 --first-name Ahmed ...
//! registrar status set STU202600001 active --reason "enrolment confirmed"
//! registrar link list STU202600001 --incoming
//! ```

mod commands;
mod config;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::Parser;
use registrar_core::ErrorKind;
use registrar_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{commands::Command, config::RegistrarConfig};

#[derive(Parser)]
#[command(name = "registrar", author, version, about = "Institutional identity registry")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "registrar.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match run(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("error: {err:#}");
      ExitCode::from(exit_code(error_kind(&err)))
    }
  }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
  let cfg = RegistrarConfig::load(&cli.config)?;
  let store_path = cfg.store_path();

  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  tracing::debug!(path = %store_path.display(), "opening store");
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_policy(cfg.policy());

  let value = commands::execute(&store, cli.command).await?;
  println!("{}", serde_json::to_string_pretty(&value)?);
  Ok(())
}

/// The registry failure kind behind `err`, if it came from the registry.
pub(crate) fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
  if let Some(e) = err.downcast_ref::<registrar_store_sqlite::Error>() {
    return Some(e.kind());
  }
  err.downcast_ref::<registrar_core::Error>().map(registrar_core::Error::kind)
}

fn exit_code(kind: Option<ErrorKind>) -> u8 {
  match kind {
    Some(ErrorKind::Validation) => 3,
    Some(ErrorKind::Conflict) => 4,
    Some(ErrorKind::NotFound) => 5,
    Some(ErrorKind::Internal) | None => 1,
  }
}
