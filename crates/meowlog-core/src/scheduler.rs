//! Dose projection and adherence statistics.
//!
//! Everything here is a pure function of a schedule, its logs and "now".
//! Calendar questions (same day, weekday, day of month) are answered in the
//! time zone carried by `now`.

use chrono::{
  DateTime, Datelike, Days, MappedLocalTime, Months, NaiveDate, NaiveDateTime,
  NaiveTime, TimeDelta, TimeZone, Utc, Weekday,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::medication::{Frequency, MedicationLog, MedicationSchedule};

/// Upper bound on months searched for a monthly dose; any day 1–31 recurs
/// well within it.
const MONTH_SEARCH_LIMIT: u32 = 48;

/// Local times inside a DST gap are pushed forward at most this many minutes.
const DST_GAP_LIMIT_MINUTES: i64 = 180;

/// What to do when a monthly anchor day does not exist in a month
/// (e.g. the 31st in April).
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MonthEndPolicy {
  /// Move on to the next month that has the day. Matches how a repeating
  /// day-of-month alert behaves.
  #[default]
  Skip,
  /// Use the last day of the short month.
  Clamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
  pub adherence_window_days: u32,
  /// Whether a skipped dose (`was_given == false`) counts as an actual dose
  /// when computing adherence.
  pub count_skipped:         bool,
  pub month_end:             MonthEndPolicy,
  /// Suppress projected doses that fall after the schedule's end date.
  pub honor_end_date:        bool,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      adherence_window_days: 30,
      count_skipped:         true,
      month_end:             MonthEndPolicy::Skip,
      honor_end_date:        true,
    }
  }
}

/// Everything the medication detail screen shows, computed in one pass.
#[derive(Debug, Clone)]
pub struct DoseSummary<Tz: TimeZone> {
  pub next_dose: Option<DateTime<Tz>>,
  /// In `[0.0, 1.0]`.
  pub adherence: f64,
  /// Taken doses inside the adherence window.
  pub taken:     usize,
  /// Skipped doses inside the adherence window.
  pub skipped:   usize,
  /// The ten most recent logs, newest first.
  pub recent:    Vec<MedicationLog>,
}

#[derive(Debug, Clone, Default)]
pub struct MedicationScheduler {
  config: SchedulerConfig,
}

impl MedicationScheduler {
  pub fn new(config: SchedulerConfig) -> Self { Self { config } }

  pub fn config(&self) -> &SchedulerConfig { &self.config }

  /// The next expected dose for `schedule`, or `None` when the schedule is
  /// inactive, as-needed, or past its end date.
  ///
  /// Daily schedules with no log on `now`'s calendar day return today at the
  /// reminder time, even if that time has already passed. Once a dose is
  /// logged today, the stored reminder anchor rolled forward by one day is
  /// returned.
  pub fn next_dose_date<Tz: TimeZone>(
    &self,
    schedule: &MedicationSchedule,
    logs: &[MedicationLog],
    now: &DateTime<Tz>,
  ) -> Option<DateTime<Tz>> {
    if !schedule.is_active {
      return None;
    }

    let tz = now.timezone();
    let clock = schedule.reminder_clock(&tz);

    let next = match schedule.frequency {
      Frequency::AsNeeded => return None,
      Frequency::Daily => {
        let today = now.date_naive();
        let logged_today = logs
          .iter()
          .any(|log| log.date.with_timezone(&tz).date_naive() == today);

        if logged_today {
          schedule.reminder_time.with_timezone(&tz) + TimeDelta::days(1)
        } else {
          resolve_local(&tz, today.and_time(clock))?
        }
      }
      Frequency::Weekly => next_weekly(now, schedule.start_date.weekday(), clock)?,
      Frequency::Monthly => self.next_monthly(now, schedule.start_date.day(), clock)?,
    };

    if self.config.honor_end_date
      && let Some(end) = schedule.end_date
      && next.date_naive() > end
    {
      return None;
    }

    Some(next)
  }

  /// Adherence over the configured window.
  pub fn adherence_rate<Tz: TimeZone>(
    &self,
    schedule: &MedicationSchedule,
    logs: &[MedicationLog],
    now: &DateTime<Tz>,
  ) -> f64 {
    let window = TimeDelta::days(i64::from(self.config.adherence_window_days));
    self.adherence_rate_over(schedule, logs, now, window)
  }

  /// Ratio of logged doses to expected doses over the `window` ending at
  /// `now`, capped at 1.0. Returns 0.0 when no dose is expected.
  pub fn adherence_rate_over<Tz: TimeZone>(
    &self,
    schedule: &MedicationSchedule,
    logs: &[MedicationLog],
    now: &DateTime<Tz>,
    window: TimeDelta,
  ) -> f64 {
    let expected = expected_doses(schedule.frequency, window.num_days());
    if expected == 0 {
      return 0.0;
    }

    let since = now.with_timezone(&Utc) - window;
    let actual = logs
      .iter()
      .filter(|log| log.date >= since)
      .filter(|log| self.config.count_skipped || log.was_given)
      .count();

    (actual as f64 / expected as f64).min(1.0)
  }

  pub fn dose_summary<Tz: TimeZone>(
    &self,
    schedule: &MedicationSchedule,
    logs: &[MedicationLog],
    now: &DateTime<Tz>,
  ) -> DoseSummary<Tz> {
    let since = now.with_timezone(&Utc)
      - TimeDelta::days(i64::from(self.config.adherence_window_days));
    let (taken, skipped) = logs
      .iter()
      .filter(|log| log.date >= since)
      .fold((0, 0), |(t, s), log| {
        if log.was_given { (t + 1, s) } else { (t, s + 1) }
      });

    let mut recent = logs.to_vec();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(10);

    DoseSummary {
      next_dose: self.next_dose_date(schedule, logs, now),
      adherence: self.adherence_rate(schedule, logs, now),
      taken,
      skipped,
      recent,
    }
  }

  fn next_monthly<Tz: TimeZone>(
    &self,
    now: &DateTime<Tz>,
    day: u32,
    clock: NaiveTime,
  ) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let mut month = now.date_naive().with_day(1)?;

    for _ in 0..MONTH_SEARCH_LIMIT {
      let date = match self.config.month_end {
        MonthEndPolicy::Skip => month.with_day(day),
        MonthEndPolicy::Clamp => month.with_day(day.min(days_in_month(month))),
      };

      if let Some(date) = date
        && let Some(candidate) = resolve_local(&tz, date.and_time(clock))
        && candidate > *now
      {
        return Some(candidate);
      }

      month = month.checked_add_months(Months::new(1))?;
    }

    None
  }
}

/// Expected dose count for a window of `days` whole days.
pub fn expected_doses(frequency: Frequency, days: i64) -> i64 {
  let days = days.max(0);
  match frequency {
    Frequency::Daily => days,
    Frequency::Weekly => days / 7,
    Frequency::Monthly => days / 30,
    Frequency::AsNeeded => 0,
  }
}

fn next_weekly<Tz: TimeZone>(
  now: &DateTime<Tz>,
  weekday: Weekday,
  clock: NaiveTime,
) -> Option<DateTime<Tz>> {
  let tz = now.timezone();
  let today = now.date_naive();

  (0..=7)
    .filter_map(|offset| today.checked_add_days(Days::new(offset)))
    .filter(|date| date.weekday() == weekday)
    .filter_map(|date| resolve_local(&tz, date.and_time(clock)))
    .find(|candidate| candidate > now)
}

fn days_in_month(first_of_month: NaiveDate) -> u32 {
  first_of_month
    .checked_add_months(Months::new(1))
    .and_then(|next| next.pred_opt())
    .map(|last| last.day())
    .unwrap_or(28)
}

/// Map a wall-clock time to an instant in `tz`. Ambiguous times take the
/// earlier instant; times inside a DST gap move to the first valid minute
/// after it.
fn resolve_local<Tz: TimeZone>(
  tz: &Tz,
  local: NaiveDateTime,
) -> Option<DateTime<Tz>> {
  match tz.from_local_datetime(&local) {
    MappedLocalTime::Single(dt) => Some(dt),
    MappedLocalTime::Ambiguous(earliest, _) => Some(earliest),
    MappedLocalTime::None => (1..=DST_GAP_LIMIT_MINUTES).find_map(|m| {
      tz.from_local_datetime(&(local + TimeDelta::minutes(m)))
        .earliest()
    }),
  }
}

#[cfg(test)]
mod tests {
  use chrono::{FixedOffset, NaiveDate};
  use chrono_tz::America::New_York;
  use uuid::Uuid;

  use super::*;

  fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(y, m, d, h, min, 0)
      .single()
      .expect("valid test timestamp")
  }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
  }

  fn schedule(
    frequency: Frequency,
    start_date: NaiveDate,
    reminder_time: DateTime<Utc>,
  ) -> MedicationSchedule {
    MedicationSchedule {
      schedule_id: Uuid::new_v4(),
      cat_id: None,
      name: "Methimazole".into(),
      dosage: "2.5mg".into(),
      frequency,
      start_date,
      end_date: None,
      reminder_time,
      is_active: true,
      notes: String::new(),
      created_at: reminder_time,
      updated_at: reminder_time,
    }
  }

  fn log(schedule: &MedicationSchedule, date: DateTime<Utc>, was_given: bool) -> MedicationLog {
    MedicationLog {
      log_id: Uuid::new_v4(),
      schedule_id: schedule.schedule_id,
      date,
      was_given,
      notes: String::new(),
      created_at: date,
    }
  }

  fn scheduler() -> MedicationScheduler { MedicationScheduler::default() }

  // ─── Daily ─────────────────────────────────────────────────────────────────

  #[test]
  fn daily_without_log_today_is_due_today() {
    let s = schedule(Frequency::Daily, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
    let next = scheduler().next_dose_date(&s, &[], &at(2024, 1, 1, 6, 0));
    assert_eq!(next, Some(at(2024, 1, 1, 8, 0)));
  }

  #[test]
  fn daily_without_log_today_uses_todays_date_not_the_anchor_date() {
    let s = schedule(Frequency::Daily, date(2023, 11, 1), at(2023, 11, 1, 8, 0));
    let stale = log(&s, at(2024, 2, 9, 8, 3), true);
    let next = scheduler().next_dose_date(&s, &[stale], &at(2024, 2, 10, 7, 0));
    assert_eq!(next, Some(at(2024, 2, 10, 8, 0)));
  }

  #[test]
  fn daily_with_log_today_rolls_the_anchor_forward_one_day() {
    let s = schedule(Frequency::Daily, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
    let logs = [log(&s, at(2024, 1, 1, 8, 5), true)];
    let next = scheduler().next_dose_date(&s, &logs, &at(2024, 1, 1, 9, 0));
    assert_eq!(next, Some(at(2024, 1, 2, 8, 0)));
  }

  #[test]
  fn daily_roll_forward_is_relative_to_the_stored_anchor() {
    let s = schedule(Frequency::Daily, date(2023, 12, 1), at(2023, 12, 1, 8, 0));
    let logs = [log(&s, at(2024, 1, 1, 7, 55), false)];
    let next = scheduler().next_dose_date(&s, &logs, &at(2024, 1, 1, 9, 0));
    assert_eq!(next, Some(at(2023, 12, 2, 8, 0)));
  }

  #[test]
  fn daily_same_day_check_uses_the_callers_zone() {
    let seoul = FixedOffset::east_opt(9 * 3600).unwrap();
    // The log and `now` fall on different UTC days but the same Seoul day.
    let s = schedule(Frequency::Daily, date(2024, 1, 1), at(2023, 12, 31, 23, 0));
    let logs = [log(&s, at(2024, 1, 1, 23, 30), true)];
    let now = at(2024, 1, 2, 0, 10).with_timezone(&seoul);

    let next = scheduler().next_dose_date(&s, &logs, &now).unwrap();
    assert_eq!(next.with_timezone(&Utc), at(2024, 1, 1, 23, 0));
  }

  // ─── Weekly ────────────────────────────────────────────────────────────────

  #[test]
  fn weekly_from_midweek_lands_on_next_anchor_weekday() {
    // 2024-01-01 is a Monday.
    let s = schedule(Frequency::Weekly, date(2024, 1, 1), at(2024, 1, 1, 9, 0));
    let next = scheduler().next_dose_date(&s, &[], &at(2024, 1, 3, 12, 0));
    assert_eq!(next, Some(at(2024, 1, 8, 9, 0)));
  }

  #[test]
  fn weekly_includes_today_when_time_has_not_passed() {
    let s = schedule(Frequency::Weekly, date(2024, 1, 1), at(2024, 1, 1, 9, 0));
    let next = scheduler().next_dose_date(&s, &[], &at(2024, 1, 15, 8, 59));
    assert_eq!(next, Some(at(2024, 1, 15, 9, 0)));
  }

  #[test]
  fn weekly_is_strictly_after_now() {
    let s = schedule(Frequency::Weekly, date(2024, 1, 1), at(2024, 1, 1, 9, 0));
    let next = scheduler().next_dose_date(&s, &[], &at(2024, 1, 15, 9, 0));
    assert_eq!(next, Some(at(2024, 1, 22, 9, 0)));
  }

  // ─── Monthly ───────────────────────────────────────────────────────────────

  #[test]
  fn monthly_projects_anchor_day_of_next_month() {
    let s = schedule(Frequency::Monthly, date(2024, 1, 15), at(2024, 1, 15, 20, 30));
    let next = scheduler().next_dose_date(&s, &[], &at(2024, 2, 20, 10, 0));
    assert_eq!(next, Some(at(2024, 3, 15, 20, 30)));
  }

  #[test]
  fn monthly_day_31_skips_short_months_by_default() {
    let s = schedule(Frequency::Monthly, date(2024, 1, 31), at(2024, 1, 31, 8, 0));
    let next = scheduler().next_dose_date(&s, &[], &at(2024, 4, 5, 8, 0));
    assert_eq!(next, Some(at(2024, 5, 31, 8, 0)));
  }

  #[test]
  fn monthly_day_31_clamps_when_configured() {
    let clamp = MedicationScheduler::new(SchedulerConfig {
      month_end: MonthEndPolicy::Clamp,
      ..SchedulerConfig::default()
    });
    let s = schedule(Frequency::Monthly, date(2024, 1, 31), at(2024, 1, 31, 8, 0));

    let next = clamp.next_dose_date(&s, &[], &at(2024, 4, 5, 8, 0));
    assert_eq!(next, Some(at(2024, 4, 30, 8, 0)));

    let next = clamp.next_dose_date(&s, &[], &at(2024, 2, 1, 8, 0));
    assert_eq!(next, Some(at(2024, 2, 29, 8, 0)));
  }

  // ─── Daylight saving ───────────────────────────────────────────────────────

  #[test]
  fn daily_time_inside_spring_gap_moves_to_first_valid_instant() {
    // 2024-03-10 02:00 EST jumps to 03:00 EDT in New York.
    let s = schedule(Frequency::Daily, date(2024, 3, 1), at(2024, 3, 1, 7, 30));
    let now = at(2024, 3, 10, 5, 0).with_timezone(&New_York);

    let next = scheduler().next_dose_date(&s, &[], &now).unwrap();
    assert_eq!(next.naive_local(), date(2024, 3, 10).and_hms_opt(3, 0, 0).unwrap());
    assert_eq!(next.with_timezone(&Utc), at(2024, 3, 10, 7, 0));
  }

  #[test]
  fn weekly_time_in_repeated_fall_hour_takes_earlier_instant() {
    // 2024-11-03 is a Sunday; 01:00-02:00 happens twice in New York.
    let s = schedule(Frequency::Weekly, date(2024, 10, 27), at(2024, 10, 27, 5, 30));
    let now = at(2024, 11, 3, 4, 0).with_timezone(&New_York);

    let next = scheduler().next_dose_date(&s, &[], &now).unwrap();
    assert_eq!(next.naive_local(), date(2024, 11, 3).and_hms_opt(1, 30, 0).unwrap());
    // 01:30 EDT, not 01:30 EST an hour later.
    assert_eq!(next.with_timezone(&Utc), at(2024, 11, 3, 5, 30));
  }

  // ─── Gating ────────────────────────────────────────────────────────────────

  #[test]
  fn as_needed_never_projects() {
    let s = schedule(Frequency::AsNeeded, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
    assert_eq!(scheduler().next_dose_date(&s, &[], &at(2024, 1, 1, 6, 0)), None);
  }

  #[test]
  fn inactive_schedules_never_project() {
    for frequency in [Frequency::Daily, Frequency::Weekly, Frequency::Monthly, Frequency::AsNeeded] {
      let mut s = schedule(frequency, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
      s.is_active = false;
      assert_eq!(scheduler().next_dose_date(&s, &[], &at(2024, 1, 1, 6, 0)), None);
    }
  }

  #[test]
  fn doses_after_end_date_are_suppressed() {
    let mut s = schedule(Frequency::Weekly, date(2024, 1, 1), at(2024, 1, 1, 9, 0));
    s.end_date = Some(date(2024, 1, 5));
    assert_eq!(scheduler().next_dose_date(&s, &[], &at(2024, 1, 3, 12, 0)), None);

    let ignore_end = MedicationScheduler::new(SchedulerConfig {
      honor_end_date: false,
      ..SchedulerConfig::default()
    });
    assert_eq!(
      ignore_end.next_dose_date(&s, &[], &at(2024, 1, 3, 12, 0)),
      Some(at(2024, 1, 8, 9, 0))
    );
  }

  // ─── Adherence ─────────────────────────────────────────────────────────────

  fn daily_logs(s: &MedicationSchedule, now: DateTime<Utc>, count: i64, skipped: i64) -> Vec<MedicationLog> {
    (0..count)
      .map(|i| log(s, now - TimeDelta::days(i) - TimeDelta::hours(1), i >= skipped))
      .collect()
  }

  #[test]
  fn daily_adherence_is_logs_over_days() {
    let now = at(2024, 1, 31, 12, 0);
    let s = schedule(Frequency::Daily, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
    let logs = daily_logs(&s, now, 24, 3);
    let rate = scheduler().adherence_rate(&s, &logs, &now);
    assert!((rate - 0.8).abs() < 1e-9, "rate = {rate}");
  }

  #[test]
  fn skipped_doses_are_excluded_when_configured() {
    let now = at(2024, 1, 31, 12, 0);
    let strict = MedicationScheduler::new(SchedulerConfig {
      count_skipped: false,
      ..SchedulerConfig::default()
    });
    let s = schedule(Frequency::Daily, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
    let logs = daily_logs(&s, now, 24, 6);
    let rate = strict.adherence_rate(&s, &logs, &now);
    assert!((rate - 0.6).abs() < 1e-9, "rate = {rate}");
  }

  #[test]
  fn logs_outside_the_window_are_ignored() {
    let now = at(2024, 1, 31, 12, 0);
    let s = schedule(Frequency::Monthly, date(2023, 12, 1), at(2023, 12, 1, 8, 0));
    let old = log(&s, now - TimeDelta::days(31), true);
    assert_eq!(scheduler().adherence_rate(&s, &[old.clone()], &now), 0.0);

    let recent = log(&s, now - TimeDelta::days(2), true);
    assert_eq!(scheduler().adherence_rate(&s, &[old, recent], &now), 1.0);
  }

  #[test]
  fn weekly_adherence_is_capped_at_one() {
    let now = at(2024, 1, 31, 12, 0);
    let s = schedule(Frequency::Weekly, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
    let logs = daily_logs(&s, now, 10, 0);
    assert_eq!(scheduler().adherence_rate(&s, &logs, &now), 1.0);
  }

  #[test]
  fn as_needed_adherence_is_zero() {
    let now = at(2024, 1, 31, 12, 0);
    let s = schedule(Frequency::AsNeeded, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
    let logs = daily_logs(&s, now, 5, 0);
    assert_eq!(scheduler().adherence_rate(&s, &logs, &now), 0.0);
  }

  #[test]
  fn adherence_stays_in_unit_interval() {
    let now = at(2024, 6, 30, 12, 0);
    for frequency in [Frequency::Daily, Frequency::Weekly, Frequency::Monthly, Frequency::AsNeeded] {
      let s = schedule(frequency, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
      for count in [0, 1, 3, 29, 30, 45, 120] {
        let logs = daily_logs(&s, now, count, count / 2);
        for window in [0, 1, 6, 7, 30, 90] {
          let rate = scheduler().adherence_rate_over(&s, &logs, &now, TimeDelta::days(window));
          assert!((0.0..=1.0).contains(&rate), "{frequency} {count} {window}: {rate}");
        }
      }
    }
  }

  #[test]
  fn expected_dose_counts_use_integer_division() {
    assert_eq!(expected_doses(Frequency::Daily, 30), 30);
    assert_eq!(expected_doses(Frequency::Weekly, 30), 4);
    assert_eq!(expected_doses(Frequency::Monthly, 29), 0);
    assert_eq!(expected_doses(Frequency::Monthly, 30), 1);
    assert_eq!(expected_doses(Frequency::AsNeeded, 30), 0);
  }

  #[test]
  fn summary_counts_and_orders_recent_logs() {
    let now = at(2024, 1, 31, 12, 0);
    let s = schedule(Frequency::Daily, date(2024, 1, 1), at(2024, 1, 1, 8, 0));
    let logs = daily_logs(&s, now, 14, 4);

    let summary = scheduler().dose_summary(&s, &logs, &now);
    assert_eq!(summary.taken, 10);
    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.recent.len(), 10);
    assert!(summary.recent.windows(2).all(|w| w[0].date >= w[1].date));
    // A dose was logged today, so the anchor rolls forward one day.
    assert_eq!(summary.next_dose, Some(at(2024, 1, 2, 8, 0)));
  }
}
