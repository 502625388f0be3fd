//! Error types for `meowlog-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cat not found: {0}")]
  CatNotFound(Uuid),

  #[error("medication schedule not found: {0}")]
  ScheduleNotFound(Uuid),

  #[error("health record not found: {0}")]
  RecordNotFound(Uuid),

  #[error("invalid time of day: {0:?}")]
  InvalidTime(String),

  #[error("unknown medication frequency: {0:?}")]
  UnknownFrequency(String),

  #[error("unknown alert action: {0:?}")]
  UnknownAction(String),

  #[error("unknown observation type discriminant: {0:?}")]
  UnknownObservation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// A persistence call failed; the store's own error is preserved.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The local alert service rejected a registration or cancellation.
  #[error("alert error: {0}")]
  Alert(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub(crate) fn alert<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Alert(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
