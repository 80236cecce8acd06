//! Logged activities and the requests that create or close them.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::activity_type::ActivityType;
use crate::detail::ActivityDetail;
use crate::types::{ActivityId, BabyId};

/// A single logged event for a baby.
///
/// An activity with no `end_time` is an open timer when its type is timed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub baby_id: BabyId,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: Option<ActivityDetail>,
}

impl Activity {
    /// Whether the activity is still running.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Time between start and end, if the activity has ended.
    #[must_use]
    pub fn duration(&self) -> Option<TimeDelta> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Everything needed to create or fully replace an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    /// Defaults to the caller's most recently added baby.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_id: Option<BabyId>,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    #[serde(flatten)]
    pub detail: Option<ActivityDetail>,
}

/// Request to start a timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerStart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_id: Option<BabyId>,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(default)]
    pub notes: String,
    #[serde(flatten)]
    pub detail: Option<ActivityDetail>,
}

/// Final values supplied when a timer stops.
///
/// Fields left `None` keep whatever the detail record already holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerStop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_ml: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Whole minutes elapsed between two instants, floored and never negative.
#[must_use]
pub fn elapsed_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().div_euclid(60).max(0)
}

/// Builds the detail record a timer holds once it is stopped.
///
/// A missing detail is created on demand so that every stopped timer ends up
/// with exactly one detail row. The elapsed duration always overwrites any
/// earlier value; supplied final fields overwrite theirs and absent ones are
/// left alone. Returns `None` only for types that are never timed.
#[must_use]
pub fn stopped_detail(
    kind: ActivityType,
    existing: Option<ActivityDetail>,
    elapsed_minutes: i64,
    stop: &TimerStop,
) -> Option<ActivityDetail> {
    let detail = existing
        .filter(|detail| detail.kind() == kind)
        .or_else(|| ActivityDetail::blank(kind))?;

    Some(match detail {
        ActivityDetail::Feed(mut feed) => {
            feed.duration_minutes = Some(elapsed_minutes);
            if let Some(amount) = stop.amount_ml {
                feed.amount_ml = Some(amount);
            }
            ActivityDetail::Feed(feed)
        }
        ActivityDetail::Pump(mut pump) => {
            pump.duration_minutes = Some(elapsed_minutes);
            if let Some(amount) = stop.amount_ml {
                pump.amount_ml = Some(amount);
            }
            ActivityDetail::Pump(pump)
        }
        ActivityDetail::Sleep(mut sleep) => {
            if let Some(quality) = stop.quality {
                sleep.quality = Some(quality);
            }
            ActivityDetail::Sleep(sleep)
        }
        other => other,
    })
}
