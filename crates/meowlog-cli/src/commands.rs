//! Subcommand definitions and their handlers.

use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta, Utc};
use clap::{Args, Subcommand};
use meowlog_core::{
  cat::{Cat, CatGender, NewCat},
  health::{
    BowelMovementKind, Consistency, NewHealthRecord, Observation, ObservationKind,
    UrineColor, UrineFrequency, UrineKind,
  },
  medication::{Frequency, MedicationSchedule, NewMedicationSchedule, parse_clock, reminder_anchor},
  reminder::{AlertAction, AlertPayload},
  service::{ActionOutcome, MedicationService},
  store::{DateRange, HealthStore, RecordQuery, ScheduleQuery},
};
use meowlog_store_sqlite::SqliteStore;
use uuid::Uuid;

pub type Service = MedicationService<SqliteStore, SqliteStore>;

const STAMP: &str = "%Y-%m-%d %H:%M";

// ─── Command tree ────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Manage cat profiles.
  #[command(subcommand)]
  Cat(CatCommand),

  /// Manage medication schedules.
  #[command(subcommand)]
  Med(MedCommand),

  /// Log a dose for a schedule, now.
  Dose {
    schedule: Uuid,
    /// Record the dose as skipped rather than taken.
    #[arg(long)]
    skipped:  bool,
    #[arg(long, default_value = "")]
    notes:    String,
  },

  /// Record or list health observations.
  #[command(subcommand)]
  Health(HealthCommand),

  /// List pending reminders.
  Alerts,

  /// Answer a reminder the way its notification buttons would.
  Act {
    /// Schedule id carried by the reminder.
    schedule: String,
    /// taken, skip, snooze, dismiss or open.
    #[arg(value_parser = AlertAction::parse)]
    action:   AlertAction,
  },

  /// Re-register reminders for every active schedule.
  Resync,
}

#[derive(Subcommand, Debug)]
pub enum CatCommand {
  Add(CatArgs),
  List,
  Show { id: Uuid },
  /// Delete a cat together with its records, schedules and reminders.
  Delete { id: Uuid },
}

#[derive(Args, Debug)]
pub struct CatArgs {
  pub name:     String,
  #[arg(long, default_value = "")]
  pub breed:    String,
  #[arg(long, default_value = "unknown")]
  pub gender:   CatGender,
  /// YYYY-MM-DD
  #[arg(long)]
  pub born:     Option<NaiveDate>,
  /// YYYY-MM-DD
  #[arg(long)]
  pub adopted:  Option<NaiveDate>,
  #[arg(long)]
  pub neutered: bool,
  #[arg(long)]
  pub weight:   Option<f64>,
  #[arg(long, default_value = "")]
  pub notes:    String,
}

#[derive(Subcommand, Debug)]
pub enum MedCommand {
  Add(MedAddArgs),
  List {
    #[arg(long)]
    cat: Option<Uuid>,
    /// Include deactivated schedules.
    #[arg(long)]
    all: bool,
  },
  /// Show a schedule with its next dose, adherence and recent logs.
  Show { id: Uuid },
  Edit(MedEditArgs),
  /// Stop reminding; logs are kept.
  Deactivate { id: Uuid },
  Reactivate { id: Uuid },
  /// Remove a schedule and its logs.
  Delete { id: Uuid },
}

#[derive(Args, Debug)]
pub struct MedAddArgs {
  pub name:      String,
  #[arg(long, default_value = "")]
  pub dosage:    String,
  /// daily, weekly, monthly or as_needed
  #[arg(long, default_value = "daily", value_parser = Frequency::parse)]
  pub frequency: Frequency,
  /// Reminder time, HH:MM local.
  #[arg(long, value_parser = parse_clock)]
  pub time:      NaiveTime,
  /// First day, YYYY-MM-DD. Defaults to today.
  #[arg(long)]
  pub start:     Option<NaiveDate>,
  #[arg(long)]
  pub end:       Option<NaiveDate>,
  #[arg(long)]
  pub cat:       Option<Uuid>,
  #[arg(long, default_value = "")]
  pub notes:     String,
}

#[derive(Args, Debug)]
pub struct MedEditArgs {
  pub id:        Uuid,
  #[arg(long)]
  pub name:      Option<String>,
  #[arg(long)]
  pub dosage:    Option<String>,
  #[arg(long, value_parser = Frequency::parse)]
  pub frequency: Option<Frequency>,
  #[arg(long, value_parser = parse_clock)]
  pub time:      Option<NaiveTime>,
  #[arg(long)]
  pub start:     Option<NaiveDate>,
  #[arg(long)]
  pub end:       Option<NaiveDate>,
  /// Clear the end date.
  #[arg(long, conflicts_with = "end")]
  pub no_end:    bool,
  #[arg(long)]
  pub notes:     Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum HealthCommand {
  Add {
    cat:         Uuid,
    #[arg(long, default_value = "")]
    notes:       String,
    #[command(subcommand)]
    observation: ObservationArg,
  },
  List {
    #[arg(long)]
    cat:   Option<Uuid>,
    /// Restrict to these observation types (repeatable).
    #[arg(long)]
    kind:  Vec<ObservationKind>,
    /// Only the last N days.
    #[arg(long)]
    days:  Option<i64>,
    #[arg(long)]
    limit: Option<usize>,
  },
}

#[derive(Subcommand, Debug)]
pub enum ObservationArg {
  Bowel { kind: BowelMovementKind, consistency: Consistency },
  Urine { kind: UrineKind, color: UrineColor, frequency: UrineFrequency },
  /// Breaths per minute.
  Respiratory { bpm: u32 },
  /// Beats per minute.
  Heart { bpm: u32 },
  Weight { kg: f64 },
  Temperature { celsius: f64 },
  Symptom { text: String },
  General,
}

impl From<ObservationArg> for Observation {
  fn from(arg: ObservationArg) -> Self {
    match arg {
      ObservationArg::Bowel { kind, consistency } => Self::BowelMovement { kind, consistency },
      ObservationArg::Urine { kind, color, frequency } => Self::Urination { kind, color, frequency },
      ObservationArg::Respiratory { bpm } => Self::RespiratoryRate(bpm),
      ObservationArg::Heart { bpm } => Self::HeartRate(bpm),
      ObservationArg::Weight { kg } => Self::Weight(kg),
      ObservationArg::Temperature { celsius } => Self::Temperature(celsius),
      ObservationArg::Symptom { text } => Self::Symptom(text),
      ObservationArg::General => Self::General,
    }
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

pub async fn run(command: Command, svc: &Service) -> Result<()> {
  match command {
    Command::Cat(cmd) => cat(cmd, svc).await,
    Command::Med(cmd) => med(cmd, svc).await,
    Command::Dose { schedule, skipped, notes } => {
      let log = svc.record_dose(schedule, !skipped, notes, Utc::now()).await?;
      let verb = if log.was_given { "taken" } else { "skipped" };
      println!("logged dose {verb} at {}", log.date.with_timezone(&Local).format(STAMP));
      Ok(())
    }
    Command::Health(cmd) => health(cmd, svc).await,
    Command::Alerts => alerts(svc).await,
    Command::Act { schedule, action } => act(&schedule, action, svc).await,
    Command::Resync => {
      let registered = svc.resync(&Local).await?;
      println!("{registered} reminder(s) registered");
      Ok(())
    }
  }
}

// ─── Cats ────────────────────────────────────────────────────────────────────

async fn cat(cmd: CatCommand, svc: &Service) -> Result<()> {
  let store = svc.store();
  match cmd {
    CatCommand::Add(args) => {
      let cat = store
        .add_cat(NewCat {
          name:          args.name,
          birth_date:    args.born,
          adoption_date: args.adopted,
          breed:         args.breed,
          gender:        args.gender,
          is_neutered:   args.neutered,
          weight_kg:     args.weight,
          notes:         args.notes,
        })
        .await?;
      println!("{}", cat.cat_id);
    }
    CatCommand::List => {
      for cat in store.list_cats().await? {
        println!("{}  {}", cat.cat_id, cat.name);
      }
    }
    CatCommand::Show { id } => {
      let cat = store.get_cat(id).await?.with_context(|| format!("no cat {id}"))?;
      print_cat(&cat);

      let schedules = store
        .list_schedules(ScheduleQuery { cat_id: Some(id), active: Some(true) })
        .await?;
      for schedule in &schedules {
        println!("  med   {}", schedule_line(schedule));
      }

      let records = store
        .list_health_records(RecordQuery {
          cat_id: Some(id),
          limit: Some(5),
          ..Default::default()
        })
        .await?;
      for record in &records {
        println!(
          "  obs   {}  {:?}  ({:?})",
          record.date.with_timezone(&Local).format(STAMP),
          record.observation,
          record.observation.concern(),
        );
      }
    }
    CatCommand::Delete { id } => {
      svc.delete_cat(id).await?;
      println!("deleted {id}");
    }
  }
  Ok(())
}

fn print_cat(cat: &Cat) {
  let today = Local::now().date_naive();
  println!("{}  {}", cat.cat_id, cat.name);
  if !cat.breed.is_empty() {
    println!("  breed     {}", cat.breed);
  }
  println!("  gender    {}{}", cat.gender, if cat.is_neutered { " (neutered)" } else { "" });
  if let Some(born) = cat.birth_date {
    println!(
      "  born      {born} ({}y {}m)",
      cat.age_years(today),
      cat.age_months(today) % 12
    );
  }
  if let Some(adopted) = cat.adoption_date {
    println!("  adopted   {adopted} ({} days ago)", cat.days_since_adoption(today));
  }
  if let Some(kg) = cat.weight_kg {
    println!("  weight    {kg:.2} kg");
  }
  if !cat.notes.is_empty() {
    println!("  notes     {}", cat.notes);
  }
}

// ─── Medications ─────────────────────────────────────────────────────────────

async fn med(cmd: MedCommand, svc: &Service) -> Result<()> {
  match cmd {
    MedCommand::Add(args) => {
      let start = args.start.unwrap_or_else(|| Local::now().date_naive());
      check_end(start, args.end)?;
      let reminder_time = reminder_anchor(&Local, start, args.time)?;
      let schedule = svc
        .create_schedule(
          NewMedicationSchedule {
            cat_id: args.cat,
            end_date: args.end,
            notes: args.notes,
            ..NewMedicationSchedule::new(args.name, args.dosage, args.frequency, start, reminder_time)
          },
          &Local,
        )
        .await?;
      println!("{}", schedule.schedule_id);
    }
    MedCommand::List { cat, all } => {
      let active = if all { None } else { Some(true) };
      let schedules = svc
        .store()
        .list_schedules(ScheduleQuery { cat_id: cat, active })
        .await?;
      for schedule in &schedules {
        println!("{}", schedule_line(schedule));
      }
    }
    MedCommand::Show { id } => {
      let now = Local::now();
      let (schedule, summary) = svc.summary(id, &now).await?;
      println!("{}", schedule_line(&schedule));
      println!("  every     {}", schedule.frequency.description());
      println!("  since     {}", schedule.start_date);
      if let Some(end) = schedule.end_date {
        println!("  until     {end}");
      }
      match summary.next_dose {
        Some(next) => println!("  next      {}", next.format(STAMP)),
        None => println!("  next      -"),
      }
      println!(
        "  adherence {:.0}% ({} taken, {} skipped)",
        summary.adherence * 100.0,
        summary.taken,
        summary.skipped
      );
      for log in &summary.recent {
        let mark = if log.was_given { "taken  " } else { "skipped" };
        println!("  {mark}   {}", log.date.with_timezone(&Local).format(STAMP));
      }
    }
    MedCommand::Edit(args) => {
      let mut schedule = svc
        .store()
        .get_schedule(args.id)
        .await?
        .with_context(|| format!("no schedule {}", args.id))?;

      if let Some(name) = args.name {
        schedule.name = name;
      }
      if let Some(dosage) = args.dosage {
        schedule.dosage = dosage;
      }
      if let Some(frequency) = args.frequency {
        schedule.frequency = frequency;
      }
      if let Some(notes) = args.notes {
        schedule.notes = notes;
      }
      if args.no_end {
        schedule.end_date = None;
      } else if let Some(end) = args.end {
        schedule.end_date = Some(end);
      }
      if args.start.is_some() || args.time.is_some() {
        let start = args.start.unwrap_or(schedule.start_date);
        let clock = args.time.unwrap_or_else(|| schedule.reminder_clock(&Local));
        schedule.start_date = start;
        schedule.reminder_time = reminder_anchor(&Local, start, clock)?;
      }
      check_end(schedule.start_date, schedule.end_date)?;

      let schedule = svc.update_schedule(schedule, &Local).await?;
      println!("{}", schedule_line(&schedule));
    }
    MedCommand::Deactivate { id } => {
      svc.deactivate_schedule(id).await?;
      println!("deactivated {id}");
    }
    MedCommand::Reactivate { id } => {
      svc.reactivate_schedule(id, &Local).await?;
      println!("reactivated {id}");
    }
    MedCommand::Delete { id } => {
      svc.delete_schedule(id).await?;
      println!("deleted {id}");
    }
  }
  Ok(())
}

fn check_end(start: NaiveDate, end: Option<NaiveDate>) -> Result<()> {
  if let Some(end) = end
    && end < start
  {
    bail!("end date {end} is before start date {start}");
  }
  Ok(())
}

fn schedule_line(schedule: &MedicationSchedule) -> String {
  format!(
    "{}  {} {}  {} at {}{}",
    schedule.schedule_id,
    schedule.name,
    schedule.dosage,
    schedule.frequency,
    schedule.reminder_clock(&Local).format("%H:%M"),
    if schedule.is_active { "" } else { "  [inactive]" },
  )
}

// ─── Health ──────────────────────────────────────────────────────────────────

async fn health(cmd: HealthCommand, svc: &Service) -> Result<()> {
  let store = svc.store();
  match cmd {
    HealthCommand::Add { cat, notes, observation } => {
      let record = store
        .add_health_record(NewHealthRecord {
          notes,
          ..NewHealthRecord::new(cat, Utc::now(), observation.into())
        })
        .await?;
      println!("{}  concern: {:?}", record.record_id, record.observation.concern());
    }
    HealthCommand::List { cat, kind, days, limit } => {
      let range = match days {
        Some(days) => lookback(Utc::now(), days)?,
        None => DateRange::all(),
      };
      let records = store
        .list_health_records(RecordQuery { cat_id: cat, kinds: kind, range, limit })
        .await?;
      for record in &records {
        println!(
          "{}  {}  {:?}  ({:?})",
          record.date.with_timezone(&Local).format(STAMP),
          record.cat_id,
          record.observation,
          record.observation.concern(),
        );
      }
    }
  }
  Ok(())
}

/// Records from the last `days` days up to `now`.
fn lookback(now: DateTime<Utc>, days: i64) -> Result<DateRange> {
  if days < 0 {
    bail!("--days must not be negative, got {days}");
  }
  let from = TimeDelta::try_days(days)
    .and_then(|window| now.checked_sub_signed(window))
    .with_context(|| format!("--days {days} reaches too far back"))?;
  Ok(DateRange::since(from))
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

async fn alerts(svc: &Service) -> Result<()> {
  for request in svc.planner().pending().await? {
    println!("{}  {}  {}", request.id, request.trigger, request.content.body);
  }
  Ok(())
}

/// Resolve the payload the way a delivered notification would carry it:
/// from the pending alert when there is one.
async fn act(schedule: &str, action: AlertAction, svc: &Service) -> Result<()> {
  let pending = svc.planner().pending().await?;
  let payload = pending
    .into_iter()
    .map(|request| request.content.payload)
    .find(|payload| payload.schedule_id == schedule)
    .unwrap_or_else(|| AlertPayload {
      schedule_id:     schedule.to_owned(),
      cat_name:        String::new(),
      medication_name: String::new(),
    });

  let now: DateTime<Local> = Local::now();
  match svc.handle_action(action, payload, &now).await? {
    ActionOutcome::Logged(log) => {
      let verb = if log.was_given { "taken" } else { "skipped" };
      println!("logged dose {verb}");
    }
    ActionOutcome::Snoozed(request) => println!("snoozed: {}", request.trigger),
    ActionOutcome::Ignored => println!("nothing to do"),
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn end_before_start_is_rejected() {
    let start = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    assert!(check_end(start, None).is_ok());
    assert!(check_end(start, Some(start)).is_ok());
    assert!(check_end(start, NaiveDate::from_ymd_opt(2024, 3, 9)).is_err());
  }

  #[test]
  fn lookback_rejects_negative_and_huge_windows() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

    let week = lookback(now, 7).unwrap();
    assert!(week.contains(Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap()));
    assert!(!week.contains(Utc.with_ymd_and_hms(2024, 3, 3, 11, 59, 0).unwrap()));

    assert!(lookback(now, -1).is_err());
    assert!(lookback(now, i64::MAX).is_err());
    assert!(lookback(now, 100_000_000).is_err());
  }
}
