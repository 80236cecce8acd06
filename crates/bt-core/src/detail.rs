//! Type-specific activity payloads.
//!
//! Every activity carries at most one detail record, and the record's variant
//! always matches the activity's [`ActivityType`]. The store keeps each variant
//! in its own table; this module is the in-memory sum type over them.

use serde::{Deserialize, Serialize};

use crate::activity_type::ActivityType;
use crate::types::define_string_enum;

define_string_enum!(
    /// How a feed was given.
    FeedMethod, "feed type" {
        Bottle => "bottle",
        BreastLeft => "breast_left",
        BreastRight => "breast_right",
        Solid => "solid",
    }
);

define_string_enum!(
    /// Which side a pump session used.
    BreastSide, "breast" {
        Left => "left",
        Right => "right",
        Both => "both",
    }
);

define_string_enum!(
    /// Diaper contents color.
    DiaperColor, "diaper color" {
        Yellow => "yellow",
        Green => "green",
        Brown => "brown",
        Black => "black",
        Red => "red",
        White => "white",
    }
);

define_string_enum!(
    /// Diaper contents consistency.
    DiaperConsistency, "diaper consistency" {
        Liquid => "liquid",
        Soft => "soft",
        Normal => "normal",
        Hard => "hard",
    }
);

define_string_enum!(
    /// Kind of health record.
    HealthRecordType, "health record type" {
        Checkup => "checkup",
        Vaccine => "vaccine",
        Illness => "illness",
    }
);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedDetail {
    /// Unset only for feeds started as a timer without a method.
    #[serde(rename = "feed_type", default, skip_serializing_if = "Option::is_none")]
    pub method: Option<FeedMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_ml: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PumpDetail {
    #[serde(rename = "breast", default, skip_serializing_if = "Option::is_none")]
    pub side: Option<BreastSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_ml: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaperDetail {
    #[serde(default)]
    pub wet: bool,
    #[serde(default)]
    pub dirty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<DiaperColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency: Option<DiaperConsistency>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepDetail {
    /// Where the baby slept (crib, bassinet, car seat, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Quality rating from 1 to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_circumference_cm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDetail {
    pub record_type: HealthRecordType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vaccine_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneDetail {
    pub milestone_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The detail record attached to an activity.
///
/// Serialized as a single `<type>_data` key so an activity flattens into the
/// same JSON shape clients already consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivityDetail {
    #[serde(rename = "feed_data")]
    Feed(FeedDetail),
    #[serde(rename = "pump_data")]
    Pump(PumpDetail),
    #[serde(rename = "diaper_data")]
    Diaper(DiaperDetail),
    #[serde(rename = "sleep_data")]
    Sleep(SleepDetail),
    #[serde(rename = "growth_data")]
    Growth(GrowthDetail),
    #[serde(rename = "health_data")]
    Health(HealthDetail),
    #[serde(rename = "milestone_data")]
    Milestone(MilestoneDetail),
}

impl ActivityDetail {
    /// The activity type this detail belongs to.
    #[must_use]
    pub const fn kind(&self) -> ActivityType {
        match self {
            Self::Feed(_) => ActivityType::Feed,
            Self::Pump(_) => ActivityType::Pump,
            Self::Diaper(_) => ActivityType::Diaper,
            Self::Sleep(_) => ActivityType::Sleep,
            Self::Growth(_) => ActivityType::Growth,
            Self::Health(_) => ActivityType::Health,
            Self::Milestone(_) => ActivityType::Milestone,
        }
    }

    /// An empty detail for a timed activity type.
    ///
    /// Returns `None` for types whose detail has required fields that cannot
    /// be defaulted.
    #[must_use]
    pub fn blank(kind: ActivityType) -> Option<Self> {
        match kind {
            ActivityType::Feed => Some(Self::Feed(FeedDetail::default())),
            ActivityType::Pump => Some(Self::Pump(PumpDetail::default())),
            ActivityType::Sleep => Some(Self::Sleep(SleepDetail::default())),
            ActivityType::Diaper
            | ActivityType::Growth
            | ActivityType::Health
            | ActivityType::Milestone => None,
        }
    }

    /// Keeps only the fields that are known when a timer starts.
    ///
    /// Amounts, durations and quality ratings are only known once the
    /// activity is over.
    #[must_use]
    pub fn start_fields(self) -> Self {
        match self {
            Self::Feed(feed) => Self::Feed(FeedDetail {
                method: feed.method,
                ..FeedDetail::default()
            }),
            Self::Pump(pump) => Self::Pump(PumpDetail {
                side: pump.side,
                ..PumpDetail::default()
            }),
            Self::Sleep(sleep) => Self::Sleep(SleepDetail {
                location: sleep.location,
                quality: None,
            }),
            other => other,
        }
    }

    /// Amount in mL for feeds and pump sessions.
    #[must_use]
    pub const fn amount_ml(&self) -> Option<f64> {
        match self {
            Self::Feed(feed) => feed.amount_ml,
            Self::Pump(pump) => pump.amount_ml,
            _ => None,
        }
    }

    /// Recorded duration in minutes for feeds and pump sessions.
    #[must_use]
    pub const fn duration_minutes(&self) -> Option<i64> {
        match self {
            Self::Feed(feed) => feed.duration_minutes,
            Self::Pump(pump) => pump.duration_minutes,
            _ => None,
        }
    }
}
