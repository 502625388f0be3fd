//! Medication schedules and the dose log attached to each of them.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// How often a medication recurs.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Frequency {
  Daily,
  Weekly,
  Monthly,
  /// No fixed cadence: never projected, never reminded.
  AsNeeded,
}

impl Frequency {
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownFrequency(s.to_owned()))
  }

  pub fn description(self) -> &'static str {
    match self {
      Self::Daily => "once a day",
      Self::Weekly => "once a week",
      Self::Monthly => "once a month",
      Self::AsNeeded => "as needed",
    }
  }
}

/// A recurring medication for one cat.
///
/// `start_date` anchors the weekday (weekly) or day of month (monthly).
/// `reminder_time` is a full timestamp; only its wall-clock hour and minute
/// matter for recurrence, except for the daily "already logged today" rule
/// which rolls the stored value itself forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationSchedule {
  pub schedule_id:   Uuid,
  pub cat_id:        Option<Uuid>,
  pub name:          String,
  pub dosage:        String,
  pub frequency:     Frequency,
  pub start_date:    NaiveDate,
  pub end_date:      Option<NaiveDate>,
  pub reminder_time: DateTime<Utc>,
  /// Soft-delete flag. Inactive schedules keep their logs.
  pub is_active:     bool,
  pub notes:         String,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl MedicationSchedule {
  /// The reminder's wall-clock time in `tz`, truncated to the minute.
  pub fn reminder_clock<Tz: TimeZone>(&self, tz: &Tz) -> NaiveTime {
    let local = self.reminder_time.with_timezone(tz);
    NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)
      .unwrap_or(NaiveTime::MIN)
  }
}

/// Input to [`crate::store::HealthStore::add_schedule`].
#[derive(Debug, Clone)]
pub struct NewMedicationSchedule {
  pub cat_id:        Option<Uuid>,
  pub name:          String,
  pub dosage:        String,
  pub frequency:     Frequency,
  pub start_date:    NaiveDate,
  pub end_date:      Option<NaiveDate>,
  pub reminder_time: DateTime<Utc>,
  pub notes:         String,
}

impl NewMedicationSchedule {
  pub fn new(
    name: impl Into<String>,
    dosage: impl Into<String>,
    frequency: Frequency,
    start_date: NaiveDate,
    reminder_time: DateTime<Utc>,
  ) -> Self {
    Self {
      cat_id: None,
      name: name.into(),
      dosage: dosage.into(),
      frequency,
      start_date,
      end_date: None,
      reminder_time,
      notes: String::new(),
    }
  }
}

/// One dose event. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationLog {
  pub log_id:      Uuid,
  pub schedule_id: Uuid,
  pub date:        DateTime<Utc>,
  /// `true` = taken, `false` = explicitly skipped.
  pub was_given:   bool,
  pub notes:       String,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::HealthStore::add_log`].
#[derive(Debug, Clone)]
pub struct NewMedicationLog {
  pub schedule_id: Uuid,
  pub date:        DateTime<Utc>,
  pub was_given:   bool,
  pub notes:       String,
}

impl NewMedicationLog {
  pub fn taken(schedule_id: Uuid, date: DateTime<Utc>) -> Self {
    Self { schedule_id, date, was_given: true, notes: String::new() }
  }

  pub fn skipped(schedule_id: Uuid, date: DateTime<Utc>) -> Self {
    Self { schedule_id, date, was_given: false, notes: String::new() }
  }
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_clock(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s.trim(), "%H:%M")
    .map_err(|_| Error::InvalidTime(s.to_owned()))
}

/// Build a reminder anchor: `clock` on `date` in `tz`, stored as UTC.
pub fn reminder_anchor<Tz: TimeZone>(
  tz: &Tz,
  date: NaiveDate,
  clock: NaiveTime,
) -> Result<DateTime<Utc>> {
  tz.from_local_datetime(&date.and_time(clock))
    .earliest()
    .map(|dt| dt.with_timezone(&Utc))
    .ok_or_else(|| Error::InvalidTime(format!("{date} {clock}")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn frequency_round_trips_through_strings() {
    assert_eq!(Frequency::parse("as_needed").unwrap(), Frequency::AsNeeded);
    assert_eq!(Frequency::parse("Weekly").unwrap(), Frequency::Weekly);
    assert_eq!(Frequency::Monthly.as_ref(), "monthly");
    assert!(matches!(
      Frequency::parse("hourly"),
      Err(Error::UnknownFrequency(_))
    ));
  }

  #[test]
  fn clock_parsing_rejects_out_of_range_values() {
    assert_eq!(parse_clock("08:30").unwrap(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
    assert!(parse_clock("24:00").is_err());
    assert!(parse_clock("7pm").is_err());
  }

  #[test]
  fn reminder_clock_drops_seconds() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let anchor = Utc.from_utc_datetime(&date.and_hms_opt(8, 15, 42).unwrap());
    let schedule = MedicationSchedule {
      schedule_id:   Uuid::nil(),
      cat_id:        None,
      name:          "Amoxicillin".into(),
      dosage:        "50mg".into(),
      frequency:     Frequency::Daily,
      start_date:    date,
      end_date:      None,
      reminder_time: anchor,
      is_active:     true,
      notes:         String::new(),
      created_at:    anchor,
      updated_at:    anchor,
    };
    assert_eq!(
      schedule.reminder_clock(&Utc),
      NaiveTime::from_hms_opt(8, 15, 0).unwrap()
    );
  }
}
