//! Baby profiles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BabyId, UserId};

/// A baby profile owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baby {
    pub id: BabyId,
    pub user_id: UserId,
    pub name: String,
    pub birth_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_height_cm: Option<f64>,
    pub sleep_tracking: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Baby {
    /// Whole days since birth as of `today`, zero for future birth dates.
    #[must_use]
    pub fn age_in_days(&self, today: NaiveDate) -> i64 {
        (today - self.birth_date).num_days().max(0)
    }

    /// Human-readable age such as "3 weeks old".
    #[must_use]
    pub fn format_age(&self, today: NaiveDate) -> String {
        format_age(self.age_in_days(today))
    }
}

/// Fields supplied when registering a baby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBaby {
    pub name: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub birth_weight_kg: Option<f64>,
    #[serde(default)]
    pub birth_height_cm: Option<f64>,
    #[serde(default = "default_sleep_tracking")]
    pub sleep_tracking: bool,
}

const fn default_sleep_tracking() -> bool {
    true
}

/// Formats an age given in days.
///
/// Under 30 days the age is shown in weeks once it reaches a full week, under
/// a year in 30-day months, and in whole years after that.
#[must_use]
pub fn format_age(days: i64) -> String {
    fn plural(n: i64, unit: &str) -> String {
        if n == 1 {
            format!("1 {unit} old")
        } else {
            format!("{n} {unit}s old")
        }
    }

    match days {
        i64::MIN..=0 => "Born today!".to_string(),
        1..=6 => plural(days, "day"),
        7..=29 => plural(days / 7, "week"),
        30..=364 => plural(days / 30, "month"),
        _ => plural(days / 365, "year"),
    }
}
