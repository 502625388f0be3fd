//! Local medication reminders.
//!
//! [`AlertCenter`] is the boundary to the platform's local-notification
//! service. [`ReminderPlanner`] turns medication schedules into alert
//! registrations against it, and owns the snooze rules.
//!
//! Each schedule owns two alert identifiers: a recurring one
//! (`medication-{id}`) and a one-shot snooze (`medication-snooze-{id}`).
//! Operations on one never touch the other.

use std::{fmt, future::Future};

use chrono::{Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  medication::{Frequency, MedicationSchedule},
};

/// Category attached to every medication alert; it carries the
/// taken/snooze/skip actions.
pub const MEDICATION_CATEGORY: &str = "MEDICATION_REMINDER";

const FALLBACK_CAT_NAME: &str = "your cat";

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// The identifier an alert is registered and cancelled under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
  /// The repeating reminder for a schedule.
  pub fn recurring(schedule_id: Uuid) -> Self {
    Self(format!("medication-{}", schedule_id.hyphenated()))
  }

  /// The one-shot snooze reminder for a schedule.
  pub fn snooze(schedule_id: Uuid) -> Self {
    Self(format!("medication-snooze-{}", schedule_id.hyphenated()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for AlertId {
  fn from(s: String) -> Self { Self(s) }
}

impl fmt::Display for AlertId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Triggers ────────────────────────────────────────────────────────────────

/// Wall-clock components a repeating alert fires on. Unset components match
/// anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMatch {
  pub hour:    u32,
  pub minute:  u32,
  pub weekday: Option<Weekday>,
  /// Day of month, 1–31.
  pub day:     Option<u32>,
}

/// When an alert fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum Trigger {
  /// Fires every time the calendar matches.
  Repeating(CalendarMatch),
  /// Fires once, this many seconds after registration.
  Once { after_seconds: u64 },
}

impl fmt::Display for Trigger {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Repeating(m) => {
        write!(f, "{:02}:{:02}", m.hour, m.minute)?;
        match (m.weekday, m.day) {
          (Some(weekday), _) => write!(f, " every {weekday}"),
          (None, Some(day)) => write!(f, " on day {day} of each month"),
          (None, None) => write!(f, " every day"),
        }
      }
      Self::Once { after_seconds } => write!(f, "once, {after_seconds}s after registration"),
    }
  }
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// Fields that travel with an alert and come back on delivery. Everything
/// is a string because the platform boundary only round-trips strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
  pub schedule_id:     String,
  pub cat_name:        String,
  pub medication_name: String,
}

impl AlertPayload {
  pub fn for_schedule(schedule: &MedicationSchedule, cat_name: Option<&str>) -> Self {
    Self {
      schedule_id:     schedule.schedule_id.hyphenated().to_string(),
      cat_name:        cat_name.unwrap_or_default().to_owned(),
      medication_name: schedule.name.clone(),
    }
  }

  /// The schedule this payload points at, if the id is well-formed.
  pub fn schedule_uuid(&self) -> Option<Uuid> {
    Uuid::parse_str(&self.schedule_id).ok()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertContent {
  pub title:    String,
  pub body:     String,
  pub category: String,
  pub payload:  AlertPayload,
}

impl AlertContent {
  pub fn medication(payload: AlertPayload) -> Self {
    let cat = if payload.cat_name.is_empty() {
      FALLBACK_CAT_NAME
    } else {
      payload.cat_name.as_str()
    };
    Self {
      title: "Medication time".to_owned(),
      body: format!("{cat}'s {} is due", payload.medication_name),
      category: MEDICATION_CATEGORY.to_owned(),
      payload,
    }
  }
}

/// A full registration: identifier, trigger and what to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRequest {
  pub id:      AlertId,
  pub trigger: Trigger,
  pub content: AlertContent,
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// What the user did with a delivered alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum AlertAction {
  #[strum(to_string = "TAKEN_ACTION", serialize = "taken")]
  Taken,
  #[strum(to_string = "SKIP_ACTION", serialize = "skip")]
  Skip,
  #[strum(to_string = "SNOOZE_ACTION", serialize = "snooze")]
  Snooze,
  #[strum(
    to_string = "com.apple.UNNotificationDismissActionIdentifier",
    serialize = "dismiss"
  )]
  Dismiss,
  #[strum(
    to_string = "com.apple.UNNotificationDefaultActionIdentifier",
    serialize = "open"
  )]
  Open,
}

impl AlertAction {
  pub fn parse(identifier: &str) -> Result<Self> {
    identifier
      .parse()
      .map_err(|_| Error::UnknownAction(identifier.to_owned()))
  }
}

// ─── Boundary trait ──────────────────────────────────────────────────────────

/// The platform's local-notification service.
///
/// Registering an id that is already pending replaces it. Cancelling an id
/// that is not pending is a no-op.
pub trait AlertCenter: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn register(
    &self,
    request: AlertRequest,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn cancel(
    &self,
    ids: Vec<AlertId>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn pending(
    &self,
  ) -> impl Future<Output = Result<Vec<AlertRequest>, Self::Error>> + Send + '_;
}

// ─── Planner ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
  pub snooze_minutes: u32,
}

impl Default for ReminderConfig {
  fn default() -> Self { Self { snooze_minutes: 10 } }
}

/// Translates schedules into registrations on an injected [`AlertCenter`].
pub struct ReminderPlanner<A> {
  alerts: A,
  config: ReminderConfig,
}

impl<A: AlertCenter> ReminderPlanner<A> {
  pub fn new(alerts: A, config: ReminderConfig) -> Self {
    Self { alerts, config }
  }

  pub fn alerts(&self) -> &A { &self.alerts }

  /// The recurring alert a schedule should have, if any. Inactive and
  /// as-needed schedules get none.
  pub fn plan<Tz: TimeZone>(
    &self,
    schedule: &MedicationSchedule,
    cat_name: Option<&str>,
    tz: &Tz,
  ) -> Option<AlertRequest> {
    if !schedule.is_active {
      return None;
    }

    let clock = schedule.reminder_clock(tz);
    let mut matching = CalendarMatch {
      hour:    clock.hour(),
      minute:  clock.minute(),
      weekday: None,
      day:     None,
    };

    match schedule.frequency {
      Frequency::AsNeeded => return None,
      Frequency::Daily => {}
      Frequency::Weekly => matching.weekday = Some(schedule.start_date.weekday()),
      Frequency::Monthly => matching.day = Some(schedule.start_date.day()),
    }

    Some(AlertRequest {
      id:      AlertId::recurring(schedule.schedule_id),
      trigger: Trigger::Repeating(matching),
      content: AlertContent::medication(AlertPayload::for_schedule(schedule, cat_name)),
    })
  }

  /// Replace the recurring alert for `schedule`. Any existing registration
  /// for the same id is cancelled first, so repeated calls leave exactly one.
  /// Returns the new registration, or `None` if the schedule should not have
  /// one.
  pub async fn register<Tz: TimeZone>(
    &self,
    schedule: &MedicationSchedule,
    cat_name: Option<&str>,
    tz: &Tz,
  ) -> Result<Option<AlertRequest>> {
    let planned = self.plan(schedule, cat_name, tz);

    self
      .alerts
      .cancel(vec![AlertId::recurring(schedule.schedule_id)])
      .await
      .map_err(Error::alert)?;

    let Some(request) = planned else {
      tracing::debug!(schedule = %schedule.schedule_id, "no reminder for schedule");
      return Ok(None);
    };

    self
      .alerts
      .register(request.clone())
      .await
      .map_err(Error::alert)?;

    tracing::debug!(
      schedule = %schedule.schedule_id,
      trigger = %request.trigger,
      "registered reminder"
    );
    Ok(Some(request))
  }

  /// Cancel both the recurring and the snooze alert for a schedule.
  pub async fn unregister(&self, schedule_id: Uuid) -> Result<()> {
    self
      .alerts
      .cancel(vec![AlertId::recurring(schedule_id), AlertId::snooze(schedule_id)])
      .await
      .map_err(Error::alert)
  }

  /// Register a one-shot reminder `snooze_minutes` from now, carrying the
  /// same payload as the alert being snoozed.
  pub async fn snooze(
    &self,
    schedule_id: Uuid,
    payload: AlertPayload,
  ) -> Result<AlertRequest> {
    let request = AlertRequest {
      id:      AlertId::snooze(schedule_id),
      trigger: Trigger::Once {
        after_seconds: u64::from(self.config.snooze_minutes) * 60,
      },
      content: AlertContent::medication(payload),
    };

    self
      .alerts
      .register(request.clone())
      .await
      .map_err(Error::alert)?;

    tracing::debug!(schedule = %schedule_id, "snoozed reminder");
    Ok(request)
  }

  pub async fn cancel_snooze(&self, schedule_id: Uuid) -> Result<()> {
    self
      .alerts
      .cancel(vec![AlertId::snooze(schedule_id)])
      .await
      .map_err(Error::alert)
  }

  pub async fn pending(&self) -> Result<Vec<AlertRequest>> {
    self.alerts.pending().await.map_err(Error::alert)
  }
}

#[cfg(test)]
mod tests {
  use std::{convert::Infallible, sync::Mutex};

  use chrono::{NaiveDate, Utc};

  use super::*;

  /// Alert center that keeps registrations in a vector, like the platform
  /// service would keep them in its pending queue.
  #[derive(Default)]
  struct Recorder {
    pending: Mutex<Vec<AlertRequest>>,
  }

  impl AlertCenter for Recorder {
    type Error = Infallible;

    fn register(
      &self,
      request: AlertRequest,
    ) -> impl Future<Output = Result<(), Infallible>> + Send + '_ {
      async move {
        let mut pending = self.pending.lock().unwrap();
        pending.retain(|r| r.id != request.id);
        pending.push(request);
        Ok(())
      }
    }

    fn cancel(
      &self,
      ids: Vec<AlertId>,
    ) -> impl Future<Output = Result<(), Infallible>> + Send + '_ {
      async move {
        self.pending.lock().unwrap().retain(|r| !ids.contains(&r.id));
        Ok(())
      }
    }

    fn pending(
      &self,
    ) -> impl Future<Output = Result<Vec<AlertRequest>, Infallible>> + Send + '_ {
      async move { Ok(self.pending.lock().unwrap().clone()) }
    }
  }

  fn planner() -> ReminderPlanner<Recorder> {
    ReminderPlanner::new(Recorder::default(), ReminderConfig::default())
  }

  fn schedule(frequency: Frequency) -> MedicationSchedule {
    // 2024-03-13 is a Wednesday.
    let start = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
    let reminder = Utc.with_ymd_and_hms(2024, 3, 13, 21, 45, 0).unwrap();
    MedicationSchedule {
      schedule_id: Uuid::new_v4(),
      cat_id: None,
      name: "Gabapentin".into(),
      dosage: "50mg".into(),
      frequency,
      start_date: start,
      end_date: None,
      reminder_time: reminder,
      is_active: true,
      notes: String::new(),
      created_at: reminder,
      updated_at: reminder,
    }
  }

  fn repeating(request: &AlertRequest) -> CalendarMatch {
    match request.trigger {
      Trigger::Repeating(m) => m,
      ref other => panic!("expected repeating trigger, got {other:?}"),
    }
  }

  #[test]
  fn triggers_follow_frequency() {
    let p = planner();

    let daily = p.plan(&schedule(Frequency::Daily), Some("Mochi"), &Utc).unwrap();
    assert_eq!(
      repeating(&daily),
      CalendarMatch { hour: 21, minute: 45, weekday: None, day: None }
    );

    let weekly = p.plan(&schedule(Frequency::Weekly), Some("Mochi"), &Utc).unwrap();
    assert_eq!(repeating(&weekly).weekday, Some(Weekday::Wed));
    assert_eq!(repeating(&weekly).day, None);

    let monthly = p.plan(&schedule(Frequency::Monthly), Some("Mochi"), &Utc).unwrap();
    assert_eq!(repeating(&monthly).day, Some(13));
    assert_eq!(repeating(&monthly).weekday, None);

    assert!(p.plan(&schedule(Frequency::AsNeeded), None, &Utc).is_none());
  }

  #[test]
  fn content_carries_payload_and_fallback_name() {
    let s = schedule(Frequency::Daily);
    let named = planner().plan(&s, Some("Mochi"), &Utc).unwrap();
    assert_eq!(named.content.body, "Mochi's Gabapentin is due");
    assert_eq!(named.content.category, MEDICATION_CATEGORY);
    assert_eq!(named.content.payload.schedule_uuid(), Some(s.schedule_id));

    let unnamed = planner().plan(&s, None, &Utc).unwrap();
    assert_eq!(unnamed.content.body, "your cat's Gabapentin is due");
    assert_eq!(unnamed.content.payload.cat_name, "");
  }

  #[tokio::test]
  async fn register_twice_leaves_one_recurring_alert() {
    let p = planner();
    let s = schedule(Frequency::Daily);

    p.register(&s, Some("Mochi"), &Utc).await.unwrap();
    p.register(&s, Some("Mochi"), &Utc).await.unwrap();

    let pending = p.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, AlertId::recurring(s.schedule_id));
  }

  #[tokio::test]
  async fn switching_to_as_needed_removes_the_alert() {
    let p = planner();
    let mut s = schedule(Frequency::Weekly);
    p.register(&s, None, &Utc).await.unwrap();

    s.frequency = Frequency::AsNeeded;
    assert!(p.register(&s, None, &Utc).await.unwrap().is_none());
    assert!(p.pending().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn snooze_is_independent_of_the_recurring_alert() {
    let p = planner();
    let s = schedule(Frequency::Daily);
    let recurring = p.register(&s, Some("Mochi"), &Utc).await.unwrap().unwrap();

    let snoozed = p
      .snooze(s.schedule_id, recurring.content.payload.clone())
      .await
      .unwrap();
    assert_eq!(snoozed.trigger, Trigger::Once { after_seconds: 600 });
    assert_eq!(snoozed.content.payload, recurring.content.payload);

    // Re-registering the recurring alert keeps the snooze.
    p.register(&s, Some("Mochi"), &Utc).await.unwrap();
    assert_eq!(p.pending().await.unwrap().len(), 2);

    // Cancelling the snooze keeps the recurring alert.
    p.cancel_snooze(s.schedule_id).await.unwrap();
    let pending = p.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, recurring.id);

    p.unregister(s.schedule_id).await.unwrap();
    assert!(p.pending().await.unwrap().is_empty());
  }

  #[test]
  fn action_identifiers_parse() {
    assert_eq!(AlertAction::parse("TAKEN_ACTION").unwrap(), AlertAction::Taken);
    assert_eq!(AlertAction::parse("snooze").unwrap(), AlertAction::Snooze);
    assert_eq!(AlertAction::Skip.to_string(), "SKIP_ACTION");
    assert!(matches!(
      AlertAction::parse("LATER_ACTION"),
      Err(Error::UnknownAction(_))
    ));
  }

  #[test]
  fn trigger_descriptions() {
    let weekly = Trigger::Repeating(CalendarMatch {
      hour:    8,
      minute:  5,
      weekday: Some(Weekday::Mon),
      day:     None,
    });
    assert_eq!(weekly.to_string(), "08:05 every Mon");
    assert_eq!(
      Trigger::Once { after_seconds: 600 }.to_string(),
      "once, 600s after registration"
    );
  }
}
