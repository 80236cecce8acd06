//! Derived statistics over a baby's activities.
//!
//! Everything here is a pure function of already-loaded activities, so the
//! store only has to fetch the right rows. Windows are half-open: an activity
//! belongs to a window when `start <= start_time < end`.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, TimeDelta, Utc};
use serde::Serialize;

use crate::activity::Activity;
use crate::activity_type::ActivityType;
use crate::detail::{ActivityDetail, FeedMethod};
use crate::tz::TzOffset;
use crate::types::ValidationError;

const WEEK_DAYS: usize = 7;
const SECONDS_PER_DAY: i64 = 86_400;

/// A half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// The local calendar day `date` in `tz`, as UTC bounds.
pub fn daily_window(date: NaiveDate, tz: TzOffset) -> Result<Window, ValidationError> {
    local_days(date, date, tz)
}

/// The seven local days ending with (and including) `date`.
pub fn weekly_window(date: NaiveDate, tz: TzOffset) -> Result<Window, ValidationError> {
    let first = date
        .checked_sub_days(Days::new(6))
        .ok_or(ValidationError::DateOutOfRange { date })?;
    local_days(first, date, tz)
}

/// Local midnight of `first` up to local midnight after `last`.
fn local_days(
    first: NaiveDate,
    last: NaiveDate,
    tz: TzOffset,
) -> Result<Window, ValidationError> {
    let midnight = |day: Option<NaiveDate>| {
        day.and_then(|day| tz.local_midnight(day))
            .ok_or(ValidationError::DateOutOfRange { date: last })
    };
    Ok(Window {
        start: midnight(Some(first))?,
        end: midnight(last.succ_opt())?,
    })
}

/// Rejects stats requests for days before the baby was born.
pub fn ensure_not_before_birth(
    date: NaiveDate,
    birth_date: NaiveDate,
) -> Result<(), ValidationError> {
    if date < birth_date {
        Err(ValidationError::BeforeBirth { date, birth_date })
    } else {
        Ok(())
    }
}

/// Fractional hours in a duration.
#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond counts for human time spans fit comfortably in f64"
)]
#[must_use]
pub fn hours(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 3_600_000.0
}

fn sleep_hours(activity: &Activity) -> f64 {
    activity.duration().map_or(0.0, hours)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiaperBreakdown {
    pub wet: u32,
    pub dirty: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyTotals {
    pub feed_amount_ml: f64,
    pub pump_amount_ml: f64,
    pub sleep_hours: f64,
}

/// Summary of one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub counts: BTreeMap<ActivityType, u32>,
    pub totals: DailyTotals,
    pub last_activities: BTreeMap<ActivityType, Option<DateTime<Utc>>>,
    /// Present only when at least one diaper was logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diaper_breakdown: Option<DiaperBreakdown>,
}

/// Summarizes the activities that start on `date` in `tz`.
///
/// Activities outside the day are ignored, so callers may pass a superset.
pub fn summarize_day(
    date: NaiveDate,
    tz: TzOffset,
    activities: &[Activity],
) -> Result<DailyStats, ValidationError> {
    let window = daily_window(date, tz)?;
    let mut counts: BTreeMap<ActivityType, u32> =
        ActivityType::ALL.iter().map(|&kind| (kind, 0)).collect();
    let mut last_activities: BTreeMap<ActivityType, Option<DateTime<Utc>>> =
        ActivityType::ALL.iter().map(|&kind| (kind, None)).collect();
    let mut totals = DailyTotals::default();
    let mut diapers = DiaperBreakdown::default();
    let mut diaper_seen = false;

    for activity in activities
        .iter()
        .filter(|activity| window.contains(activity.start_time))
    {
        *counts.entry(activity.kind).or_default() += 1;
        let last = last_activities.entry(activity.kind).or_default();
        if last.is_none_or(|seen| activity.start_time > seen) {
            *last = Some(activity.start_time);
        }

        match (&activity.kind, &activity.detail) {
            (ActivityType::Feed, Some(detail)) | (ActivityType::Pump, Some(detail)) => {
                if let Some(amount) = detail.amount_ml() {
                    if activity.kind == ActivityType::Feed {
                        totals.feed_amount_ml += amount;
                    } else {
                        totals.pump_amount_ml += amount;
                    }
                }
            }
            (ActivityType::Diaper, detail) => {
                diaper_seen = true;
                if let Some(ActivityDetail::Diaper(diaper)) = detail {
                    diapers.wet += u32::from(diaper.wet);
                    diapers.dirty += u32::from(diaper.dirty);
                }
            }
            (ActivityType::Sleep, _) => totals.sleep_hours += sleep_hours(activity),
            _ => {}
        }
    }

    Ok(DailyStats {
        date: tz.local_date(window.start),
        counts,
        totals,
        last_activities,
        diaper_breakdown: diaper_seen.then_some(diapers),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastFeed {
    pub time: DateTime<Utc>,
    pub hours_ago: f64,
    #[serde(rename = "type")]
    pub method: Option<FeedMethod>,
    pub amount_ml: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastDiaper {
    pub time: DateTime<Utc>,
    pub hours_ago: f64,
    pub wet: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastSleep {
    pub ended: DateTime<Utc>,
    pub duration_hours: f64,
}

/// What happened most recently, relative to now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentStats {
    pub last_feed: Option<LastFeed>,
    pub last_diaper: Option<LastDiaper>,
    pub currently_sleeping: bool,
    /// Only reported while the baby is awake.
    pub last_sleep: Option<LastSleep>,
}

fn latest<'a>(
    activities: &'a [Activity],
    keep: impl Fn(&Activity) -> bool,
) -> Option<&'a Activity> {
    activities
        .iter()
        .filter(|activity| keep(activity))
        .max_by_key(|activity| activity.start_time)
}

/// Builds the recent snapshot from a baby's activities.
///
/// Only the latest feed, latest diaper and latest open and closed sleeps
/// matter, so the store may pass just those rows.
#[must_use]
pub fn recent_snapshot(now: DateTime<Utc>, activities: &[Activity]) -> RecentStats {
    let last_feed = latest(activities, |a| a.kind == ActivityType::Feed).map(|feed| {
        let (method, amount_ml) = match &feed.detail {
            Some(ActivityDetail::Feed(detail)) => (detail.method, detail.amount_ml),
            _ => (None, None),
        };
        LastFeed {
            time: feed.start_time,
            hours_ago: hours(now - feed.start_time),
            method,
            amount_ml,
        }
    });

    let last_diaper = latest(activities, |a| a.kind == ActivityType::Diaper).map(|diaper| {
        let (wet, dirty) = match &diaper.detail {
            Some(ActivityDetail::Diaper(detail)) => (detail.wet, detail.dirty),
            _ => (false, false),
        };
        LastDiaper {
            time: diaper.start_time,
            hours_ago: hours(now - diaper.start_time),
            wet,
            dirty,
        }
    });

    let currently_sleeping =
        latest(activities, |a| a.kind == ActivityType::Sleep && a.is_open()).is_some();

    let last_sleep = if currently_sleeping {
        None
    } else {
        latest(activities, |a| a.kind == ActivityType::Sleep && !a.is_open()).and_then(|sleep| {
            sleep.end_time.map(|ended| LastSleep {
                ended,
                duration_hours: sleep_hours(sleep),
            })
        })
    };

    RecentStats {
        last_feed,
        last_diaper,
        currently_sleeping,
        last_sleep,
    }
}

/// One day of the weekly breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDataPoint {
    pub date: NaiveDate,
    pub diaper_count: u32,
    pub feed_count: u32,
    pub sleep_duration_hours: f64,
}

/// Change between the first and last growth measurement of a week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GrowthChange {
    pub weight_change_kg: Option<f64>,
    pub height_change_cm: Option<f64>,
}

/// Trailing seven-day overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyStats {
    pub start_date: NaiveDate,
    /// Exclusive: the day after the requested date.
    pub end_date: NaiveDate,
    pub daily_averages: BTreeMap<String, f64>,
    pub daily_breakdown: Vec<DailyDataPoint>,
    pub growth_this_week: Option<GrowthChange>,
}

/// Summarizes the seven local days ending with `date` in `tz`.
pub fn summarize_week(
    date: NaiveDate,
    tz: TzOffset,
    activities: &[Activity],
) -> Result<WeeklyStats, ValidationError> {
    let window = weekly_window(date, tz)?;
    let start_date = tz.local_date(window.start);

    let mut counts: BTreeMap<ActivityType, u32> =
        ActivityType::ALL.iter().map(|&kind| (kind, 0)).collect();
    let mut feed_ml = 0.0;
    let mut pump_ml = 0.0;
    let mut sleep_total = 0.0;
    let mut days: Vec<DailyDataPoint> = (0..7)
        .map(|offset| DailyDataPoint {
            date: start_date + Days::new(offset),
            diaper_count: 0,
            feed_count: 0,
            sleep_duration_hours: 0.0,
        })
        .collect();

    let in_window: Vec<&Activity> = activities
        .iter()
        .filter(|activity| window.contains(activity.start_time))
        .collect();

    for activity in &in_window {
        let Some(day) = day_index(&window, activity.start_time).and_then(|i| days.get_mut(i))
        else {
            continue;
        };
        *counts.entry(activity.kind).or_default() += 1;
        match activity.kind {
            ActivityType::Feed => {
                day.feed_count += 1;
                feed_ml += activity
                    .detail
                    .as_ref()
                    .and_then(ActivityDetail::amount_ml)
                    .unwrap_or(0.0);
            }
            ActivityType::Pump => {
                pump_ml += activity
                    .detail
                    .as_ref()
                    .and_then(ActivityDetail::amount_ml)
                    .unwrap_or(0.0);
            }
            ActivityType::Diaper => day.diaper_count += 1,
            ActivityType::Sleep => {
                let slept = sleep_hours(activity);
                day.sleep_duration_hours += slept;
                sleep_total += slept;
            }
            ActivityType::Growth | ActivityType::Health | ActivityType::Milestone => {}
        }
    }

    let per_day = |total: f64| total / 7.0;
    let mut daily_averages: BTreeMap<String, f64> = counts
        .iter()
        .map(|(kind, &count)| (format!("{kind}_per_day"), per_day(f64::from(count))))
        .collect();
    let feeds = counts.get(&ActivityType::Feed).copied().unwrap_or(0);
    daily_averages.insert(
        "feed_amount_ml_per_feed".to_string(),
        if feeds > 0 {
            feed_ml / f64::from(feeds)
        } else {
            0.0
        },
    );
    daily_averages.insert("feed_amount_ml_per_day".to_string(), per_day(feed_ml));
    daily_averages.insert("pump_amount_ml_per_day".to_string(), per_day(pump_ml));
    daily_averages.insert("sleep_hours_per_day".to_string(), per_day(sleep_total));

    Ok(WeeklyStats {
        start_date,
        end_date: tz.local_date(window.end),
        daily_averages,
        daily_breakdown: days,
        growth_this_week: growth_change(&in_window),
    })
}

fn day_index(window: &Window, instant: DateTime<Utc>) -> Option<usize> {
    let days = (instant - window.start)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY);
    usize::try_from(days).ok().filter(|&i| i < WEEK_DAYS)
}

fn growth_change(activities: &[&Activity]) -> Option<GrowthChange> {
    let growths = || {
        activities
            .iter()
            .filter(|activity| activity.kind == ActivityType::Growth)
    };
    let first = growths().min_by_key(|activity| activity.start_time)?;
    let last = growths().max_by_key(|activity| activity.start_time)?;
    if first.id == last.id {
        return None;
    }

    let (Some(ActivityDetail::Growth(before)), Some(ActivityDetail::Growth(after))) =
        (&first.detail, &last.detail)
    else {
        return Some(GrowthChange::default());
    };
    let change = |from: Option<f64>, to: Option<f64>| from.zip(to).map(|(a, b)| b - a);
    Some(GrowthChange {
        weight_change_kg: change(before.weight_kg, after.weight_kg),
        height_change_cm: change(before.height_cm, after.height_cm),
    })
}
