//! Health records — dated observations about a cat.
//!
//! A record carries one typed [`Observation`]. Records are written once and
//! only ever deleted, never edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Bowel movements ─────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BowelMovementKind {
  Normal,
  Diarrhea,
  Constipation,
  Blood,
  Mucus,
}

impl BowelMovementKind {
  pub fn severity(self) -> u8 {
    match self {
      Self::Normal => 0,
      Self::Constipation => 1,
      Self::Mucus => 2,
      Self::Diarrhea => 3,
      Self::Blood => 4,
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Consistency {
  Hard,
  Normal,
  Soft,
  Watery,
}

impl Consistency {
  /// Position on the Bristol stool scale (1–7).
  pub fn bristol_scale(self) -> u8 {
    match self {
      Self::Hard => 1,
      Self::Normal => 3,
      Self::Soft => 5,
      Self::Watery => 7,
    }
  }
}

// ─── Urination ───────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UrineKind {
  Normal,
  Straining,
  Bloody,
  NoOutput,
}

impl UrineKind {
  pub fn severity(self) -> u8 {
    match self {
      Self::Normal => 0,
      Self::Straining => 2,
      Self::Bloody | Self::NoOutput => 4,
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UrineColor {
  LightYellow,
  Clear,
  DarkYellow,
  Orange,
  Red,
}

impl UrineColor {
  pub fn severity(self) -> u8 {
    match self {
      Self::LightYellow => 0,
      Self::Clear | Self::DarkYellow => 1,
      Self::Orange => 2,
      Self::Red => 4,
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UrineFrequency {
  Normal,
  Increased,
  Decreased,
}

impl UrineFrequency {
  pub fn severity(self) -> u8 {
    match self {
      Self::Normal => 0,
      Self::Increased | Self::Decreased => 2,
    }
  }
}

// ─── Observation ─────────────────────────────────────────────────────────────

/// The type tag of an [`Observation`]; stored in the `observation_type`
/// column and used to filter record queries.
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
#[strum(serialize_all = "snake_case")]
pub enum ObservationKind {
  BowelMovement,
  Urination,
  RespiratoryRate,
  HeartRate,
  Weight,
  Temperature,
  Symptom,
  General,
}

/// The typed payload of a health record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Observation {
  BowelMovement {
    kind:        BowelMovementKind,
    consistency: Consistency,
  },
  Urination {
    kind:      UrineKind,
    color:     UrineColor,
    frequency: UrineFrequency,
  },
  /// Breaths per minute.
  RespiratoryRate(u32),
  /// Beats per minute.
  HeartRate(u32),
  /// Kilograms.
  Weight(f64),
  /// Degrees Celsius.
  Temperature(f64),
  Symptom(String),
  General,
}

/// How worried the owner should be about an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcernLevel {
  None,
  Observe,
  Caution,
  Emergency,
}

impl ConcernLevel {
  pub fn from_severity(severity: u8) -> Self {
    match severity {
      0 => Self::None,
      1 => Self::Observe,
      2 | 3 => Self::Caution,
      _ => Self::Emergency,
    }
  }
}

impl Observation {
  pub fn kind(&self) -> ObservationKind {
    match self {
      Self::BowelMovement { .. } => ObservationKind::BowelMovement,
      Self::Urination { .. } => ObservationKind::Urination,
      Self::RespiratoryRate(_) => ObservationKind::RespiratoryRate,
      Self::HeartRate(_) => ObservationKind::HeartRate,
      Self::Weight(_) => ObservationKind::Weight,
      Self::Temperature(_) => ObservationKind::Temperature,
      Self::Symptom(_) => ObservationKind::Symptom,
      Self::General => ObservationKind::General,
    }
  }

  /// Highest severity among the observation's components.
  pub fn severity(&self) -> u8 {
    match self {
      Self::BowelMovement { kind, .. } => kind.severity(),
      Self::Urination { kind, color, frequency } => kind
        .severity()
        .max(color.severity())
        .max(frequency.severity()),
      Self::Symptom(_) => 1,
      Self::RespiratoryRate(_)
      | Self::HeartRate(_)
      | Self::Weight(_)
      | Self::Temperature(_)
      | Self::General => 0,
    }
  }

  pub fn concern(&self) -> ConcernLevel {
    ConcernLevel::from_severity(self.severity())
  }

  /// Serialise the inner payload (without the type tag) for the
  /// `value_json` database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild an observation from its stored discriminant and payload.
  pub fn from_parts(discriminant: &str, data: serde_json::Value) -> Result<Self> {
    discriminant
      .parse::<ObservationKind>()
      .map_err(|_| Error::UnknownObservation(discriminant.to_owned()))?;

    let wrapped = if data.is_null() {
      serde_json::json!({ "type": discriminant })
    } else {
      serde_json::json!({ "type": discriminant, "data": data })
    };
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
  pub record_id:   Uuid,
  pub cat_id:      Uuid,
  /// When the observation was made.
  pub date:        DateTime<Utc>,
  pub observation: Observation,
  pub notes:       String,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::HealthStore::add_health_record`].
#[derive(Debug, Clone)]
pub struct NewHealthRecord {
  pub cat_id:      Uuid,
  pub date:        DateTime<Utc>,
  pub observation: Observation,
  pub notes:       String,
}

impl NewHealthRecord {
  pub fn new(cat_id: Uuid, date: DateTime<Utc>, observation: Observation) -> Self {
    Self { cat_id, date, observation, notes: String::new() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn urination_severity_is_the_worst_component() {
    let obs = Observation::Urination {
      kind:      UrineKind::Normal,
      color:     UrineColor::Orange,
      frequency: UrineFrequency::Normal,
    };
    assert_eq!(obs.severity(), 2);
    assert_eq!(obs.concern(), ConcernLevel::Caution);

    let obs = Observation::Urination {
      kind:      UrineKind::Straining,
      color:     UrineColor::Red,
      frequency: UrineFrequency::Decreased,
    };
    assert_eq!(obs.concern(), ConcernLevel::Emergency);
  }

  #[test]
  fn bowel_movement_concern_follows_kind() {
    let obs = Observation::BowelMovement {
      kind:        BowelMovementKind::Constipation,
      consistency: Consistency::Hard,
    };
    assert_eq!(obs.concern(), ConcernLevel::Observe);
    assert_eq!(Consistency::Watery.bristol_scale(), 7);
  }

  #[test]
  fn payload_excludes_the_type_tag() {
    let obs = Observation::HeartRate(140);
    assert_eq!(obs.kind().as_ref(), "heart_rate");
    assert_eq!(obs.to_json().unwrap(), serde_json::json!(140));

    let back = Observation::from_parts("heart_rate", serde_json::json!(140)).unwrap();
    assert_eq!(back, obs);
  }

  #[test]
  fn unit_variant_has_null_payload() {
    let obs = Observation::General;
    assert!(obs.to_json().unwrap().is_null());
    let back = Observation::from_parts("general", serde_json::Value::Null).unwrap();
    assert_eq!(back, Observation::General);
  }

  #[test]
  fn unknown_discriminant_is_rejected() {
    let err = Observation::from_parts("hairball", serde_json::Value::Null).unwrap_err();
    assert!(matches!(err, Error::UnknownObservation(d) if d == "hairball"));
  }
}
