//! Layered configuration: built-in defaults, then the TOML file, then
//! `MEOWLOG_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use meowlog_core::{
  reminder::ReminderConfig,
  scheduler::{MonthEndPolicy, SchedulerConfig},
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub store_path:            PathBuf,
  pub adherence_window_days: u32,
  pub count_skipped_doses:   bool,
  pub month_end:             MonthEndPolicy,
  pub snooze_minutes:        u32,
}

impl Default for AppConfig {
  fn default() -> Self {
    let scheduler = SchedulerConfig::default();
    Self {
      store_path:            PathBuf::from("~/.local/share/meowlog/meowlog.db"),
      adherence_window_days: scheduler.adherence_window_days,
      count_skipped_doses:   scheduler.count_skipped,
      month_end:             scheduler.month_end,
      snooze_minutes:        ReminderConfig::default().snooze_minutes,
    }
  }
}

impl AppConfig {
  /// Read `path` (if it exists) and the environment on top of the defaults.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("MEOWLOG"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn scheduler(&self) -> SchedulerConfig {
    SchedulerConfig {
      adherence_window_days: self.adherence_window_days,
      count_skipped: self.count_skipped_doses,
      month_end: self.month_end,
      ..SchedulerConfig::default()
    }
  }

  pub fn reminders(&self) -> ReminderConfig {
    ReminderConfig { snooze_minutes: self.snooze_minutes }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn from_toml(src: &str) -> AppConfig {
    config::Config::builder()
      .add_source(config::File::from_str(src, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.adherence_window_days, 30);
    assert!(cfg.count_skipped_doses);
    assert_eq!(cfg.month_end, MonthEndPolicy::Skip);
    assert_eq!(cfg.snooze_minutes, 10);
  }

  #[test]
  fn file_values_reach_the_scheduler() {
    let cfg = from_toml(
      r#"
        adherence_window_days = 14
        count_skipped_doses = false
        month_end = "clamp"
        snooze_minutes = 5
      "#,
    );
    let scheduler = cfg.scheduler();
    assert_eq!(scheduler.adherence_window_days, 14);
    assert!(!scheduler.count_skipped);
    assert_eq!(scheduler.month_end, MonthEndPolicy::Clamp);
    assert!(scheduler.honor_end_date);
    assert_eq!(cfg.reminders().snooze_minutes, 5);
  }

  #[test]
  fn tilde_is_expanded_only_at_the_start() {
    let plain = Path::new("/var/lib/meowlog.db");
    assert_eq!(expand_tilde(plain), plain);

    let odd = Path::new("data/~/meowlog.db");
    assert_eq!(expand_tilde(odd), odd);

    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/meowlog.db")),
        PathBuf::from(home).join("meowlog.db")
      );
    }
  }
}
