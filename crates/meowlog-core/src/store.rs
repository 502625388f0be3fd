//! The `HealthStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `meowlog-store-sqlite`). The service layer depends on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  cat::{Cat, NewCat},
  health::{HealthRecord, NewHealthRecord, ObservationKind},
  medication::{
    MedicationLog, MedicationSchedule, NewMedicationLog, NewMedicationSchedule,
  },
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// A half-open time range `[from, until)`; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
  pub from:  Option<DateTime<Utc>>,
  pub until: Option<DateTime<Utc>>,
}

impl DateRange {
  pub fn all() -> Self { Self::default() }

  pub fn since(from: DateTime<Utc>) -> Self {
    Self { from: Some(from), until: None }
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.from.is_none_or(|from| at >= from)
      && self.until.is_none_or(|until| at < until)
  }
}

/// Parameters for [`HealthStore::list_schedules`].
#[derive(Debug, Clone, Default)]
pub struct ScheduleQuery {
  pub cat_id: Option<Uuid>,
  /// `Some(true)` for active schedules only, `Some(false)` for deactivated
  /// ones, `None` for both.
  pub active: Option<bool>,
}

impl ScheduleQuery {
  pub fn active() -> Self { Self { cat_id: None, active: Some(true) } }
}

/// Parameters for [`HealthStore::list_health_records`].
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  pub cat_id: Option<Uuid>,
  /// Restrict to these observation kinds; empty means all.
  pub kinds:  Vec<ObservationKind>,
  pub range:  DateRange,
  pub limit:  Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Meowlog persistence backend.
///
/// Every call is atomic. Deletes cascade explicitly: a cat takes its health
/// records and schedules with it, and a schedule takes its logs. Logs have
/// no update operation.
pub trait HealthStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Cats ──────────────────────────────────────────────────────────────

  fn add_cat(
    &self,
    input: NewCat,
  ) -> impl Future<Output = Result<Cat, Self::Error>> + Send + '_;

  fn get_cat(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Cat>, Self::Error>> + Send + '_;

  /// All cats, oldest profile first.
  fn list_cats(
    &self,
  ) -> impl Future<Output = Result<Vec<Cat>, Self::Error>> + Send + '_;

  /// Overwrite a cat's editable fields. `updated_at` is set by the store.
  fn update_cat(
    &self,
    cat: Cat,
  ) -> impl Future<Output = Result<Cat, Self::Error>> + Send + '_;

  /// Delete a cat with its health records, schedules and their logs.
  fn delete_cat(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Health records ────────────────────────────────────────────────────

  fn add_health_record(
    &self,
    input: NewHealthRecord,
  ) -> impl Future<Output = Result<HealthRecord, Self::Error>> + Send + '_;

  /// Records matching `query`, newest first.
  fn list_health_records(
    &self,
    query: RecordQuery,
  ) -> impl Future<Output = Result<Vec<HealthRecord>, Self::Error>> + Send + '_;

  fn delete_health_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Medication schedules ──────────────────────────────────────────────

  fn add_schedule(
    &self,
    input: NewMedicationSchedule,
  ) -> impl Future<Output = Result<MedicationSchedule, Self::Error>> + Send + '_;

  fn get_schedule(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<MedicationSchedule>, Self::Error>>
  + Send
  + '_;

  fn list_schedules(
    &self,
    query: ScheduleQuery,
  ) -> impl Future<Output = Result<Vec<MedicationSchedule>, Self::Error>>
  + Send
  + '_;

  /// Overwrite a schedule's editable fields. `updated_at` is set by the
  /// store.
  fn update_schedule(
    &self,
    schedule: MedicationSchedule,
  ) -> impl Future<Output = Result<MedicationSchedule, Self::Error>> + Send + '_;

  /// Flip the soft-delete flag. Logs are untouched.
  fn set_schedule_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<MedicationSchedule, Self::Error>> + Send + '_;

  /// Physically remove a schedule and its logs.
  fn delete_schedule(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Medication logs — append-only ─────────────────────────────────────

  fn add_log(
    &self,
    input: NewMedicationLog,
  ) -> impl Future<Output = Result<MedicationLog, Self::Error>> + Send + '_;

  /// Logs for a schedule inside `range`, oldest first.
  fn list_logs(
    &self,
    schedule_id: Uuid,
    range: DateRange,
  ) -> impl Future<Output = Result<Vec<MedicationLog>, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn range_is_half_open() {
    let t = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
    let range = DateRange { from: Some(t(8)), until: Some(t(10)) };
    assert!(!range.contains(t(7)));
    assert!(range.contains(t(8)));
    assert!(range.contains(t(9)));
    assert!(!range.contains(t(10)));
    assert!(DateRange::all().contains(t(23)));
  }
}
