//! Error type for `meowlog-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] meowlog_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column holds a value no domain type accepts.
  #[error("cannot decode column {column}: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("cat not found: {0}")]
  CatNotFound(uuid::Uuid),

  #[error("medication schedule not found: {0}")]
  ScheduleNotFound(uuid::Uuid),

  #[error("health record not found: {0}")]
  RecordNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
