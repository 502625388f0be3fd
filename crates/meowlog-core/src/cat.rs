//! Cat profiles — the owner of every health record and medication schedule.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

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
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CatGender {
  Male,
  Female,
  #[default]
  Unknown,
}

/// A cat profile as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cat {
  pub cat_id:        Uuid,
  pub name:          String,
  pub birth_date:    Option<NaiveDate>,
  pub adoption_date: Option<NaiveDate>,
  pub breed:         String,
  pub gender:        CatGender,
  pub is_neutered:   bool,
  pub weight_kg:     Option<f64>,
  pub notes:         String,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Cat {
  /// Whole years since birth, or 0 when the birth date is unknown.
  pub fn age_years(&self, today: NaiveDate) -> u32 {
    self
      .birth_date
      .and_then(|b| today.years_since(b))
      .unwrap_or(0)
  }

  /// Whole months since birth, or 0 when the birth date is unknown.
  pub fn age_months(&self, today: NaiveDate) -> u32 {
    self
      .birth_date
      .map(|b| months_between(b, today))
      .unwrap_or(0)
  }

  pub fn days_since_adoption(&self, today: NaiveDate) -> i64 {
    self
      .adoption_date
      .map(|a| (today - a).num_days().max(0))
      .unwrap_or(0)
  }
}

fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
  if to <= from {
    return 0;
  }
  let mut months = (to.year() - from.year()) * 12 + to.month() as i32
    - from.month() as i32;
  if to.day() < from.day() {
    months -= 1;
  }
  months.max(0) as u32
}

/// Input to [`crate::store::HealthStore::add_cat`].
/// Ids and timestamps are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewCat {
  pub name:          String,
  pub birth_date:    Option<NaiveDate>,
  pub adoption_date: Option<NaiveDate>,
  pub breed:         String,
  pub gender:        CatGender,
  pub is_neutered:   bool,
  pub weight_kg:     Option<f64>,
  pub notes:         String,
}

impl NewCat {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }
}
