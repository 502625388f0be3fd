//! [`MedicationService`] — the layer that edits schedules and reacts to
//! delivered alerts.
//!
//! It owns a [`HealthStore`] and a [`ReminderPlanner`], and keeps the two in
//! step: every write that changes what a schedule should remind about is
//! followed by a re-registration. Store and alert failures are returned as
//! they happen; nothing is retried.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  medication::{MedicationLog, MedicationSchedule, NewMedicationLog, NewMedicationSchedule},
  reminder::{AlertAction, AlertCenter, AlertPayload, AlertRequest, ReminderPlanner},
  scheduler::{DoseSummary, MedicationScheduler},
  store::{DateRange, HealthStore, ScheduleQuery},
};

/// What [`MedicationService::handle_action`] did.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
  /// A dose log was written (taken or skipped).
  Logged(MedicationLog),
  /// A one-shot reminder was registered.
  Snoozed(AlertRequest),
  /// The payload did not resolve to a schedule, or the action needs no work.
  Ignored,
}

pub struct MedicationService<S, A> {
  store:     S,
  planner:   ReminderPlanner<A>,
  scheduler: MedicationScheduler,
}

impl<S, A> MedicationService<S, A>
where
  S: HealthStore,
  A: AlertCenter,
{
  pub fn new(store: S, planner: ReminderPlanner<A>, scheduler: MedicationScheduler) -> Self {
    Self { store, planner, scheduler }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn planner(&self) -> &ReminderPlanner<A> { &self.planner }

  pub fn scheduler(&self) -> &MedicationScheduler { &self.scheduler }

  // ── Schedule lifecycle ────────────────────────────────────────────────

  /// Persist a new schedule, then register its reminder.
  ///
  /// If registration fails the schedule is already stored and the error is
  /// returned anyway; [`Self::resync`] registers it later.
  pub async fn create_schedule<Tz: TimeZone>(
    &self,
    input: NewMedicationSchedule,
    tz: &Tz,
  ) -> Result<MedicationSchedule> {
    let cat_name = self.cat_name(input.cat_id).await?;
    let schedule = self.store.add_schedule(input).await.map_err(Error::store)?;
    tracing::info!(schedule = %schedule.schedule_id, name = %schedule.name, "created medication schedule");

    self.planner.register(&schedule, cat_name.as_deref(), tz).await?;
    Ok(schedule)
  }

  /// Persist an edited schedule and replace its reminder.
  pub async fn update_schedule<Tz: TimeZone>(
    &self,
    schedule: MedicationSchedule,
    tz: &Tz,
  ) -> Result<MedicationSchedule> {
    self.require_schedule(schedule.schedule_id).await?;
    let cat_name = self.cat_name(schedule.cat_id).await?;

    let schedule = self.store.update_schedule(schedule).await.map_err(Error::store)?;
    tracing::info!(schedule = %schedule.schedule_id, "updated medication schedule");

    self.planner.register(&schedule, cat_name.as_deref(), tz).await?;
    Ok(schedule)
  }

  /// Soft-delete: the schedule stops projecting and reminding, its logs
  /// stay.
  pub async fn deactivate_schedule(&self, id: Uuid) -> Result<MedicationSchedule> {
    self.require_schedule(id).await?;
    let schedule = self
      .store
      .set_schedule_active(id, false)
      .await
      .map_err(Error::store)?;
    self.planner.unregister(id).await?;
    tracing::info!(schedule = %id, "deactivated medication schedule");
    Ok(schedule)
  }

  pub async fn reactivate_schedule<Tz: TimeZone>(
    &self,
    id: Uuid,
    tz: &Tz,
  ) -> Result<MedicationSchedule> {
    self.require_schedule(id).await?;
    let schedule = self
      .store
      .set_schedule_active(id, true)
      .await
      .map_err(Error::store)?;
    let cat_name = self.cat_name(schedule.cat_id).await?;
    self.planner.register(&schedule, cat_name.as_deref(), tz).await?;
    tracing::info!(schedule = %id, "reactivated medication schedule");
    Ok(schedule)
  }

  /// Remove a schedule, its logs and its alerts for good.
  ///
  /// The store goes first: if it fails, the schedule keeps its alerts. An
  /// alert left behind by a failed cancel points at an unknown schedule and
  /// is ignored by [`Self::handle_action`].
  pub async fn delete_schedule(&self, id: Uuid) -> Result<()> {
    self.require_schedule(id).await?;
    self.store.delete_schedule(id).await.map_err(Error::store)?;
    self.planner.unregister(id).await?;
    tracing::info!(schedule = %id, "deleted medication schedule");
    Ok(())
  }

  /// Remove a cat with everything it owns, including pending alerts for its
  /// schedules.
  pub async fn delete_cat(&self, cat_id: Uuid) -> Result<()> {
    self
      .store
      .get_cat(cat_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CatNotFound(cat_id))?;

    let schedules = self
      .store
      .list_schedules(ScheduleQuery { cat_id: Some(cat_id), active: None })
      .await
      .map_err(Error::store)?;

    self.store.delete_cat(cat_id).await.map_err(Error::store)?;
    for schedule in &schedules {
      self.planner.unregister(schedule.schedule_id).await?;
    }
    tracing::info!(cat = %cat_id, schedules = schedules.len(), "deleted cat");
    Ok(())
  }

  /// Re-register reminders for every active schedule, e.g. at startup or
  /// after the time zone changed. Returns how many alerts are registered.
  pub async fn resync<Tz: TimeZone>(&self, tz: &Tz) -> Result<usize> {
    let schedules = self
      .store
      .list_schedules(ScheduleQuery::active())
      .await
      .map_err(Error::store)?;

    let mut registered = 0;
    for schedule in &schedules {
      let cat_name = self.cat_name(schedule.cat_id).await?;
      if self.planner.register(schedule, cat_name.as_deref(), tz).await?.is_some() {
        registered += 1;
      }
    }
    Ok(registered)
  }

  // ── Doses ─────────────────────────────────────────────────────────────

  pub async fn record_dose(
    &self,
    schedule_id: Uuid,
    was_given: bool,
    notes: impl Into<String>,
    at: DateTime<Utc>,
  ) -> Result<MedicationLog> {
    self.require_schedule(schedule_id).await?;
    let log = self
      .store
      .add_log(NewMedicationLog { schedule_id, date: at, was_given, notes: notes.into() })
      .await
      .map_err(Error::store)?;
    tracing::info!(schedule = %schedule_id, was_given, "recorded dose");
    Ok(log)
  }

  /// React to the user's choice on a delivered alert.
  ///
  /// A payload whose schedule id does not parse, does not exist or points at
  /// a deactivated schedule is ignored rather than treated as an error.
  pub async fn handle_action<Tz: TimeZone>(
    &self,
    action: AlertAction,
    payload: AlertPayload,
    now: &DateTime<Tz>,
  ) -> Result<ActionOutcome> {
    let Some(schedule_id) = payload.schedule_uuid() else {
      tracing::warn!(schedule = %payload.schedule_id, "ignoring alert with malformed schedule id");
      return Ok(ActionOutcome::Ignored);
    };

    let schedule = self
      .store
      .get_schedule(schedule_id)
      .await
      .map_err(Error::store)?;
    match schedule {
      None => {
        tracing::warn!(schedule = %schedule_id, "ignoring alert for unknown schedule");
        return Ok(ActionOutcome::Ignored);
      }
      Some(schedule) if !schedule.is_active => {
        tracing::warn!(schedule = %schedule_id, "ignoring alert for inactive schedule");
        return Ok(ActionOutcome::Ignored);
      }
      Some(_) => {}
    }

    let at = now.with_timezone(&Utc);
    match action {
      AlertAction::Taken => {
        let log = self.record_dose(schedule_id, true, "", at).await?;
        self.planner.cancel_snooze(schedule_id).await?;
        Ok(ActionOutcome::Logged(log))
      }
      AlertAction::Skip => {
        let log = self.record_dose(schedule_id, false, "", at).await?;
        Ok(ActionOutcome::Logged(log))
      }
      AlertAction::Snooze => {
        let request = self.planner.snooze(schedule_id, payload).await?;
        Ok(ActionOutcome::Snoozed(request))
      }
      AlertAction::Dismiss | AlertAction::Open => Ok(ActionOutcome::Ignored),
    }
  }

  // ── Queries ───────────────────────────────────────────────────────────

  pub async fn next_dose<Tz: TimeZone>(
    &self,
    schedule_id: Uuid,
    now: &DateTime<Tz>,
  ) -> Result<Option<DateTime<Tz>>> {
    let (schedule, logs) = self.load(schedule_id).await?;
    Ok(self.scheduler.next_dose_date(&schedule, &logs, now))
  }

  pub async fn adherence<Tz: TimeZone>(
    &self,
    schedule_id: Uuid,
    now: &DateTime<Tz>,
  ) -> Result<f64> {
    let (schedule, logs) = self.load(schedule_id).await?;
    Ok(self.scheduler.adherence_rate(&schedule, &logs, now))
  }

  pub async fn summary<Tz: TimeZone>(
    &self,
    schedule_id: Uuid,
    now: &DateTime<Tz>,
  ) -> Result<(MedicationSchedule, DoseSummary<Tz>)> {
    let (schedule, logs) = self.load(schedule_id).await?;
    let summary = self.scheduler.dose_summary(&schedule, &logs, now);
    Ok((schedule, summary))
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn require_schedule(&self, id: Uuid) -> Result<MedicationSchedule> {
    self
      .store
      .get_schedule(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ScheduleNotFound(id))
  }

  async fn load(&self, id: Uuid) -> Result<(MedicationSchedule, Vec<MedicationLog>)> {
    let schedule = self.require_schedule(id).await?;
    let logs = self
      .store
      .list_logs(id, DateRange::all())
      .await
      .map_err(Error::store)?;
    Ok((schedule, logs))
  }

  async fn cat_name(&self, cat_id: Option<Uuid>) -> Result<Option<String>> {
    let Some(cat_id) = cat_id else {
      return Ok(None);
    };
    let cat = self
      .store
      .get_cat(cat_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CatNotFound(cat_id))?;
    Ok(Some(cat.name))
  }
}
