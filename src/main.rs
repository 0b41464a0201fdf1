mod api;
mod app;
mod auth;
mod cache;
mod cli;
mod commands;
mod config;
mod error;
mod event;
mod render;
mod session;

use clap::Parser;
use color_eyre::Result;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::{App, Console, Outcome};
use crate::cli::{Args, Command};

/// Log to a daily file under the data directory so stdout carries only
/// command output. Filter from OADMIN_LOG, default `oadmin=info`.
fn init_logging() -> Option<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))?
    .join("oadmin")
    .join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "oadmin.log"));
  let filter = EnvFilter::try_from_env("OADMIN_LOG").unwrap_or_else(|_| EnvFilter::new("oadmin=info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .ok()?;

  Some(guard)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging();

  // Load configuration; --api-base wins over OADMIN_API_BASE
  let api_base = args
    .api_base
    .or_else(|| std::env::var("OADMIN_API_BASE").ok());
  let config = config::Config::load(args.config.as_deref())?.with_api_base(api_base);

  let app = App::new(config)?;
  let mut console = Console::stdin();

  match args.command {
    None | Some(Command::Shell) => {
      app.shell(&mut console).await;
      Ok(ExitCode::SUCCESS)
    }
    Some(cmd) => match app.run(&cmd, &mut console).await {
      Outcome::Done => Ok(ExitCode::SUCCESS),
      Outcome::Failed | Outcome::Unauthorized => Ok(ExitCode::FAILURE),
    },
  }
}
