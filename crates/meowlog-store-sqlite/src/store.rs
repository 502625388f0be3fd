//! [`SqliteStore`] — the SQLite implementation of [`HealthStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use meowlog_core::{
  cat::{Cat, NewCat},
  health::{HealthRecord, NewHealthRecord},
  medication::{
    MedicationLog, MedicationSchedule, NewMedicationLog, NewMedicationSchedule,
  },
  store::{DateRange, HealthStore, RecordQuery, ScheduleQuery},
};

use crate::{
  Error, Result,
  encode::{
    CAT_COLUMNS, LOG_COLUMNS, RECORD_COLUMNS, RawCat, RawHealthRecord, RawLog,
    RawSchedule, SCHEDULE_COLUMNS, encode_date, encode_dt, encode_uuid,
    normalize_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Meowlog store backed by a single SQLite file.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn write_cat(&self, cat: &Cat) -> Result<()> {
    let params: Vec<Value> = vec![
      encode_uuid(cat.cat_id).into(),
      cat.name.clone().into(),
      cat.birth_date.map(encode_date).into(),
      cat.adoption_date.map(encode_date).into(),
      cat.breed.clone().into(),
      cat.gender.as_ref().to_owned().into(),
      cat.is_neutered.into(),
      cat.weight_kg.into(),
      cat.notes.clone().into(),
      encode_dt(cat.created_at).into(),
      encode_dt(cat.updated_at).into(),
    ];

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO cats ({CAT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(cat_id) DO UPDATE SET
               name = excluded.name,
               birth_date = excluded.birth_date,
               adoption_date = excluded.adoption_date,
               breed = excluded.breed,
               gender = excluded.gender,
               is_neutered = excluded.is_neutered,
               weight_kg = excluded.weight_kg,
               notes = excluded.notes,
               updated_at = excluded.updated_at"
          ),
          rusqlite::params_from_iter(params),
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn write_schedule(&self, schedule: &MedicationSchedule) -> Result<()> {
    let params: Vec<Value> = vec![
      encode_uuid(schedule.schedule_id).into(),
      schedule.cat_id.map(encode_uuid).into(),
      schedule.name.clone().into(),
      schedule.dosage.clone().into(),
      schedule.frequency.as_ref().to_owned().into(),
      encode_date(schedule.start_date).into(),
      schedule.end_date.map(encode_date).into(),
      encode_dt(schedule.reminder_time).into(),
      schedule.is_active.into(),
      schedule.notes.clone().into(),
      encode_dt(schedule.created_at).into(),
      encode_dt(schedule.updated_at).into(),
    ];

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO medication_schedules ({SCHEDULE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(schedule_id) DO UPDATE SET
               cat_id = excluded.cat_id,
               name = excluded.name,
               dosage = excluded.dosage,
               frequency = excluded.frequency,
               start_date = excluded.start_date,
               end_date = excluded.end_date,
               reminder_time = excluded.reminder_time,
               is_active = excluded.is_active,
               notes = excluded.notes,
               updated_at = excluded.updated_at"
          ),
          rusqlite::params_from_iter(params),
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── HealthStore impl ────────────────────────────────────────────────────────

impl HealthStore for SqliteStore {
  type Error = Error;

  // ── Cats ──────────────────────────────────────────────────────────────────

  async fn add_cat(&self, input: NewCat) -> Result<Cat> {
    let now = normalize_dt(Utc::now());
    let cat = Cat {
      cat_id:        Uuid::new_v4(),
      name:          input.name,
      birth_date:    input.birth_date,
      adoption_date: input.adoption_date,
      breed:         input.breed,
      gender:        input.gender,
      is_neutered:   input.is_neutered,
      weight_kg:     input.weight_kg,
      notes:         input.notes,
      created_at:    now,
      updated_at:    now,
    };

    self.write_cat(&cat).await?;
    Ok(cat)
  }

  async fn get_cat(&self, id: Uuid) -> Result<Option<Cat>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCat> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CAT_COLUMNS} FROM cats WHERE cat_id = ?1"),
              rusqlite::params![id_str],
              RawCat::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCat::into_cat).transpose()
  }

  async fn list_cats(&self) -> Result<Vec<Cat>> {
    let raws: Vec<RawCat> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {CAT_COLUMNS} FROM cats ORDER BY created_at, name"))?;
        let rows = stmt
          .query_map([], RawCat::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCat::into_cat).collect()
  }

  async fn update_cat(&self, cat: Cat) -> Result<Cat> {
    let existing = self
      .get_cat(cat.cat_id)
      .await?
      .ok_or(Error::CatNotFound(cat.cat_id))?;

    let cat = Cat {
      created_at: existing.created_at,
      updated_at: normalize_dt(Utc::now()),
      ..cat
    };
    self.write_cat(&cat).await?;
    Ok(cat)
  }

  async fn delete_cat(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM medication_logs WHERE schedule_id IN
             (SELECT schedule_id FROM medication_schedules WHERE cat_id = ?1)",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM medication_schedules WHERE cat_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM health_records WHERE cat_id = ?1",
          rusqlite::params![id_str],
        )?;
        let deleted =
          tx.execute("DELETE FROM cats WHERE cat_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(deleted)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::CatNotFound(id));
    }
    Ok(())
  }

  // ── Health records ────────────────────────────────────────────────────────

  async fn add_health_record(&self, input: NewHealthRecord) -> Result<HealthRecord> {
    if self.get_cat(input.cat_id).await?.is_none() {
      return Err(Error::CatNotFound(input.cat_id));
    }

    let record = HealthRecord {
      record_id:   Uuid::new_v4(),
      cat_id:      input.cat_id,
      date:        normalize_dt(input.date),
      observation: input.observation,
      notes:       input.notes,
      created_at:  normalize_dt(Utc::now()),
    };

    let params: Vec<Value> = vec![
      encode_uuid(record.record_id).into(),
      encode_uuid(record.cat_id).into(),
      record.observation.kind().as_ref().to_owned().into(),
      record.observation.to_json()?.to_string().into(),
      encode_dt(record.date).into(),
      record.notes.clone().into(),
      encode_dt(record.created_at).into(),
    ];

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO health_records ({RECORD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
          ),
          rusqlite::params_from_iter(params),
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn list_health_records(&self, query: RecordQuery) -> Result<Vec<HealthRecord>> {
    let mut conds: Vec<String> = vec![];
    let mut params: Vec<Value> = vec![];

    if let Some(cat_id) = query.cat_id {
      conds.push("cat_id = ?".to_owned());
      params.push(encode_uuid(cat_id).into());
    }
    if !query.kinds.is_empty() {
      let marks = vec!["?"; query.kinds.len()].join(", ");
      conds.push(format!("observation_type IN ({marks})"));
      params.extend(query.kinds.iter().map(|k| Value::from(k.as_ref().to_owned())));
    }
    push_range(&mut conds, &mut params, "date", query.range);

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
    params.push(limit.into());

    let raws: Vec<RawHealthRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM health_records
           {where_clause}
           ORDER BY date DESC
           LIMIT ?"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawHealthRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHealthRecord::into_record).collect()
  }

  async fn delete_health_record(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM health_records WHERE record_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::RecordNotFound(id));
    }
    Ok(())
  }

  // ── Medication schedules ──────────────────────────────────────────────────

  async fn add_schedule(&self, input: NewMedicationSchedule) -> Result<MedicationSchedule> {
    if let Some(cat_id) = input.cat_id
      && self.get_cat(cat_id).await?.is_none()
    {
      return Err(Error::CatNotFound(cat_id));
    }

    let now = normalize_dt(Utc::now());
    let schedule = MedicationSchedule {
      schedule_id:   Uuid::new_v4(),
      cat_id:        input.cat_id,
      name:          input.name,
      dosage:        input.dosage,
      frequency:     input.frequency,
      start_date:    input.start_date,
      end_date:      input.end_date,
      reminder_time: normalize_dt(input.reminder_time),
      is_active:     true,
      notes:         input.notes,
      created_at:    now,
      updated_at:    now,
    };

    self.write_schedule(&schedule).await?;
    Ok(schedule)
  }

  async fn get_schedule(&self, id: Uuid) -> Result<Option<MedicationSchedule>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSchedule> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SCHEDULE_COLUMNS} FROM medication_schedules WHERE schedule_id = ?1"
              ),
              rusqlite::params![id_str],
              RawSchedule::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSchedule::into_schedule).transpose()
  }

  async fn list_schedules(&self, query: ScheduleQuery) -> Result<Vec<MedicationSchedule>> {
    let mut conds: Vec<&'static str> = vec![];
    let mut params: Vec<Value> = vec![];

    if let Some(cat_id) = query.cat_id {
      conds.push("cat_id = ?");
      params.push(encode_uuid(cat_id).into());
    }
    if let Some(active) = query.active {
      conds.push("is_active = ?");
      params.push(active.into());
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let raws: Vec<RawSchedule> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SCHEDULE_COLUMNS} FROM medication_schedules
           {where_clause}
           ORDER BY created_at, name"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawSchedule::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchedule::into_schedule).collect()
  }

  async fn update_schedule(&self, schedule: MedicationSchedule) -> Result<MedicationSchedule> {
    let existing = self
      .get_schedule(schedule.schedule_id)
      .await?
      .ok_or(Error::ScheduleNotFound(schedule.schedule_id))?;

    if let Some(cat_id) = schedule.cat_id
      && self.get_cat(cat_id).await?.is_none()
    {
      return Err(Error::CatNotFound(cat_id));
    }

    let schedule = MedicationSchedule {
      reminder_time: normalize_dt(schedule.reminder_time),
      created_at: existing.created_at,
      updated_at: normalize_dt(Utc::now()),
      ..schedule
    };
    self.write_schedule(&schedule).await?;
    Ok(schedule)
  }

  async fn set_schedule_active(&self, id: Uuid, active: bool) -> Result<MedicationSchedule> {
    let mut schedule = self
      .get_schedule(id)
      .await?
      .ok_or(Error::ScheduleNotFound(id))?;

    schedule.is_active = active;
    schedule.updated_at = normalize_dt(Utc::now());
    self.write_schedule(&schedule).await?;
    Ok(schedule)
  }

  async fn delete_schedule(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM medication_logs WHERE schedule_id = ?1",
          rusqlite::params![id_str],
        )?;
        let deleted = tx.execute(
          "DELETE FROM medication_schedules WHERE schedule_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(deleted)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::ScheduleNotFound(id));
    }
    Ok(())
  }

  // ── Medication logs ───────────────────────────────────────────────────────

  async fn add_log(&self, input: NewMedicationLog) -> Result<MedicationLog> {
    if self.get_schedule(input.schedule_id).await?.is_none() {
      return Err(Error::ScheduleNotFound(input.schedule_id));
    }

    let log = MedicationLog {
      log_id:      Uuid::new_v4(),
      schedule_id: input.schedule_id,
      date:        normalize_dt(input.date),
      was_given:   input.was_given,
      notes:       input.notes,
      created_at:  normalize_dt(Utc::now()),
    };

    let params: Vec<Value> = vec![
      encode_uuid(log.log_id).into(),
      encode_uuid(log.schedule_id).into(),
      encode_dt(log.date).into(),
      log.was_given.into(),
      log.notes.clone().into(),
      encode_dt(log.created_at).into(),
    ];

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO medication_logs ({LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
          rusqlite::params_from_iter(params),
        )?;
        Ok(())
      })
      .await?;

    Ok(log)
  }

  async fn list_logs(&self, schedule_id: Uuid, range: DateRange) -> Result<Vec<MedicationLog>> {
    let mut conds = vec!["schedule_id = ?".to_owned()];
    let mut params: Vec<Value> = vec![encode_uuid(schedule_id).into()];
    push_range(&mut conds, &mut params, "date", range);
    let where_clause = conds.join(" AND ");

    let raws: Vec<RawLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LOG_COLUMNS} FROM medication_logs
           WHERE {where_clause}
           ORDER BY date"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawLog::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLog::into_log).collect()
  }
}

/// Append `[from, until)` conditions on `column` for whichever bounds are set.
fn push_range(
  conds: &mut Vec<String>,
  params: &mut Vec<Value>,
  column: &str,
  range: DateRange,
) {
  if let Some(from) = range.from {
    conds.push(format!("{column} >= ?"));
    params.push(encode_dt(normalize_dt(from)).into());
  }
  if let Some(until) = range.until {
    conds.push(format!("{column} < ?"));
    params.push(encode_dt(normalize_dt(until)).into());
  }
}
