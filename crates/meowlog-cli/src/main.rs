//! `meowlog` — cat health and medication tracker.
//!
//! Reads `meowlog.toml` (or the path given with `--config`), opens the SQLite
//! store, and runs one subcommand against it.
//!
//! # Usage
//!
//! ```
//! meowlog cat add Mochi --born 2020-05-01
//! meowlog med add Amoxicillin --dosage 50mg --time 08:00 --cat <cat-id>
//! meowlog act <schedule-id> taken
//! ```

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Local;
use clap::Parser;
use meowlog_core::{reminder::ReminderPlanner, scheduler::MedicationScheduler, service::MedicationService};
use meowlog_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{commands::Command, settings::AppConfig};

#[derive(Parser)]
#[command(author, version, about = "Cat health and medication tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, env = "MEOWLOG_CONFIG", default_value = "meowlog.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  if let Some(dir) = cfg.store_path.parent()
    && !dir.as_os_str().is_empty()
  {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let service = MedicationService::new(
    store.clone(),
    ReminderPlanner::new(store, cfg.reminders()),
    MedicationScheduler::new(cfg.scheduler()),
  );

  // Keep pending reminders in line with the local zone before any command.
  let registered = service.resync(&Local).await?;
  tracing::debug!(registered, "reminders synchronised");

  commands::run(cli.command, &service).await
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;
  use meowlog_core::{
    health::{Observation, UrineColor, UrineFrequency, UrineKind},
    medication::Frequency,
    reminder::AlertAction,
  };

  use super::*;
  use crate::commands::{HealthCommand, MedCommand};

  #[test]
  fn cli_is_well_formed() { Cli::command().debug_assert(); }

  #[test]
  fn act_accepts_button_identifiers() {
    let cli = Cli::parse_from(["meowlog", "act", "not-a-uuid", "SNOOZE_ACTION"]);
    let Command::Act { schedule, action } = cli.command else {
      panic!("expected act");
    };
    assert_eq!(schedule, "not-a-uuid");
    assert_eq!(action, AlertAction::Snooze);

    assert!(Cli::try_parse_from(["meowlog", "act", "x", "later"]).is_err());
  }

  #[test]
  fn med_add_parses_frequency_and_clock() {
    let cli = Cli::parse_from([
      "meowlog", "med", "add", "Gabapentin", "--frequency", "weekly", "--time", "21:30",
    ]);
    let Command::Med(MedCommand::Add(args)) = cli.command else {
      panic!("expected med add");
    };
    assert_eq!(args.frequency, Frequency::Weekly);
    assert_eq!(args.time.to_string(), "21:30:00");

    assert!(
      Cli::try_parse_from(["meowlog", "med", "add", "X", "--time", "25:00"]).is_err()
    );
  }

  #[test]
  fn health_add_builds_an_observation() {
    let cat = uuid::Uuid::new_v4().to_string();
    let cli = Cli::parse_from([
      "meowlog", "health", "add", &cat, "urine", "straining", "red", "increased",
    ]);
    let Command::Health(HealthCommand::Add { observation, .. }) = cli.command else {
      panic!("expected health add");
    };
    assert_eq!(
      Observation::from(observation),
      Observation::Urination {
        kind:      UrineKind::Straining,
        color:     UrineColor::Red,
        frequency: UrineFrequency::Increased,
      }
    );
  }
}
