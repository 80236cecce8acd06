//! Core domain logic for the baby tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Activities: the seven activity types and their detail records
//! - Validation: input limits for activities, timers and babies
//! - Statistics: daily, weekly and recent summaries over loaded activities
//! - Timezones: browser-style offsets and local day boundaries

pub mod activity;
pub mod activity_type;
pub mod baby;
pub mod detail;
pub mod stats;
pub mod types;
pub mod tz;
pub mod validate;

pub use activity::{Activity, NewActivity, TimerStart, TimerStop, elapsed_minutes, stopped_detail};
pub use activity_type::ActivityType;
pub use baby::{Baby, NewBaby, format_age};
pub use detail::{
    ActivityDetail, BreastSide, DiaperColor, DiaperConsistency, DiaperDetail, FeedDetail,
    FeedMethod, GrowthDetail, HealthDetail, HealthRecordType, MilestoneDetail, PumpDetail,
    SleepDetail,
};
pub use stats::{DailyStats, RecentStats, WeeklyStats, Window};
pub use types::{ActivityId, BabyId, UserId, ValidationError, parse_date};
pub use tz::TzOffset;
pub use validate::{ValidationLimits, Validator};
