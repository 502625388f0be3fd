//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with
//! microsecond precision, so lexical order equals chronological order and
//! range filters can compare strings. Calendar dates are `YYYY-MM-DD`.
//! UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use meowlog_core::{
  cat::{Cat, CatGender},
  health::{HealthRecord, Observation},
  medication::{Frequency, MedicationLog, MedicationSchedule},
  reminder::{AlertContent, AlertId, AlertRequest, Trigger},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Drop sub-microsecond precision so a value reads back exactly as written.
pub fn normalize_dt(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_gender(s: &str) -> Result<CatGender> {
  s.parse().map_err(|_| Error::Decode { column: "gender", value: s.to_owned() })
}

pub fn decode_frequency(s: &str) -> Result<Frequency> {
  s.parse().map_err(|_| Error::Decode { column: "frequency", value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const CAT_COLUMNS: &str = "cat_id, name, birth_date, adoption_date, breed, gender, \
                               is_neutered, weight_kg, notes, created_at, updated_at";

/// Raw values read directly from a `cats` row.
pub struct RawCat {
  pub cat_id:        String,
  pub name:          String,
  pub birth_date:    Option<String>,
  pub adoption_date: Option<String>,
  pub breed:         String,
  pub gender:        String,
  pub is_neutered:   bool,
  pub weight_kg:     Option<f64>,
  pub notes:         String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawCat {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      cat_id:        row.get(0)?,
      name:          row.get(1)?,
      birth_date:    row.get(2)?,
      adoption_date: row.get(3)?,
      breed:         row.get(4)?,
      gender:        row.get(5)?,
      is_neutered:   row.get(6)?,
      weight_kg:     row.get(7)?,
      notes:         row.get(8)?,
      created_at:    row.get(9)?,
      updated_at:    row.get(10)?,
    })
  }

  pub fn into_cat(self) -> Result<Cat> {
    Ok(Cat {
      cat_id:        decode_uuid(&self.cat_id)?,
      name:          self.name,
      birth_date:    self.birth_date.as_deref().map(decode_date).transpose()?,
      adoption_date: self.adoption_date.as_deref().map(decode_date).transpose()?,
      breed:         self.breed,
      gender:        decode_gender(&self.gender)?,
      is_neutered:   self.is_neutered,
      weight_kg:     self.weight_kg,
      notes:         self.notes,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub const RECORD_COLUMNS: &str =
  "record_id, cat_id, observation_type, value_json, date, notes, created_at";

/// Raw values read directly from a `health_records` row.
pub struct RawHealthRecord {
  pub record_id:        String,
  pub cat_id:           String,
  pub observation_type: String,
  pub value_json:       String,
  pub date:             String,
  pub notes:            String,
  pub created_at:       String,
}

impl RawHealthRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:        row.get(0)?,
      cat_id:           row.get(1)?,
      observation_type: row.get(2)?,
      value_json:       row.get(3)?,
      date:             row.get(4)?,
      notes:            row.get(5)?,
      created_at:       row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<HealthRecord> {
    let value: serde_json::Value = serde_json::from_str(&self.value_json)?;
    Ok(HealthRecord {
      record_id:   decode_uuid(&self.record_id)?,
      cat_id:      decode_uuid(&self.cat_id)?,
      date:        decode_dt(&self.date)?,
      observation: Observation::from_parts(&self.observation_type, value)?,
      notes:       self.notes,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const SCHEDULE_COLUMNS: &str = "schedule_id, cat_id, name, dosage, frequency, start_date, \
                                    end_date, reminder_time, is_active, notes, created_at, \
                                    updated_at";

/// Raw values read directly from a `medication_schedules` row.
pub struct RawSchedule {
  pub schedule_id:   String,
  pub cat_id:        Option<String>,
  pub name:          String,
  pub dosage:        String,
  pub frequency:     String,
  pub start_date:    String,
  pub end_date:      Option<String>,
  pub reminder_time: String,
  pub is_active:     bool,
  pub notes:         String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawSchedule {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      schedule_id:   row.get(0)?,
      cat_id:        row.get(1)?,
      name:          row.get(2)?,
      dosage:        row.get(3)?,
      frequency:     row.get(4)?,
      start_date:    row.get(5)?,
      end_date:      row.get(6)?,
      reminder_time: row.get(7)?,
      is_active:     row.get(8)?,
      notes:         row.get(9)?,
      created_at:    row.get(10)?,
      updated_at:    row.get(11)?,
    })
  }

  pub fn into_schedule(self) -> Result<MedicationSchedule> {
    Ok(MedicationSchedule {
      schedule_id:   decode_uuid(&self.schedule_id)?,
      cat_id:        self.cat_id.as_deref().map(decode_uuid).transpose()?,
      name:          self.name,
      dosage:        self.dosage,
      frequency:     decode_frequency(&self.frequency)?,
      start_date:    decode_date(&self.start_date)?,
      end_date:      self.end_date.as_deref().map(decode_date).transpose()?,
      reminder_time: decode_dt(&self.reminder_time)?,
      is_active:     self.is_active,
      notes:         self.notes,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub const LOG_COLUMNS: &str = "log_id, schedule_id, date, was_given, notes, created_at";

/// Raw values read directly from a `medication_logs` row.
pub struct RawLog {
  pub log_id:      String,
  pub schedule_id: String,
  pub date:        String,
  pub was_given:   bool,
  pub notes:       String,
  pub created_at:  String,
}

impl RawLog {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:      row.get(0)?,
      schedule_id: row.get(1)?,
      date:        row.get(2)?,
      was_given:   row.get(3)?,
      notes:       row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_log(self) -> Result<MedicationLog> {
    Ok(MedicationLog {
      log_id:      decode_uuid(&self.log_id)?,
      schedule_id: decode_uuid(&self.schedule_id)?,
      date:        decode_dt(&self.date)?,
      was_given:   self.was_given,
      notes:       self.notes,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `pending_alerts` row.
pub struct RawAlert {
  pub alert_id:     String,
  pub trigger_json: String,
  pub content_json: String,
}

impl RawAlert {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:     row.get(0)?,
      trigger_json: row.get(1)?,
      content_json: row.get(2)?,
    })
  }

  pub fn into_request(self) -> Result<AlertRequest> {
    let trigger: Trigger = serde_json::from_str(&self.trigger_json)?;
    let content: AlertContent = serde_json::from_str(&self.content_json)?;
    Ok(AlertRequest { id: AlertId::from(self.alert_id), trigger, content })
  }
}
