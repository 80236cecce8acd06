//! Statistics queries: fetch the rows, then aggregate with `bt_core::stats`.

use bt_core::stats::{
    daily_window, ensure_not_before_birth, recent_snapshot, summarize_day, summarize_week,
    weekly_window,
};
use bt_core::{
    Activity, BabyId, DailyStats, RecentStats, TzOffset, UserId, WeeklyStats, Window,
};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::activities::{ACTIVITY_SELECT, query_activities};
use crate::babies::find_baby;
use crate::{Database, DbError, format_timestamp};

impl Database {
    /// Summarizes one local calendar day for a baby.
    pub fn daily_stats(
        &self,
        user: &UserId,
        baby_id: Option<&BabyId>,
        date: NaiveDate,
        tz: TzOffset,
    ) -> Result<DailyStats, DbError> {
        let baby = find_baby(&self.conn, user, baby_id)?;
        ensure_not_before_birth(date, baby.birth_date)?;
        let activities = self.activities_in_window(&baby.id, daily_window(date, tz)?)?;
        Ok(summarize_day(date, tz, &activities)?)
    }

    /// Summarizes the seven local days ending with `date`.
    pub fn weekly_stats(
        &self,
        user: &UserId,
        baby_id: Option<&BabyId>,
        date: NaiveDate,
        tz: TzOffset,
    ) -> Result<WeeklyStats, DbError> {
        let baby = find_baby(&self.conn, user, baby_id)?;
        ensure_not_before_birth(date, baby.birth_date)?;
        let activities = self.activities_in_window(&baby.id, weekly_window(date, tz)?)?;
        Ok(summarize_week(date, tz, &activities)?)
    }

    /// Latest feed, diaper and sleep state relative to now.
    pub fn recent_stats(
        &self,
        user: &UserId,
        baby_id: Option<&BabyId>,
    ) -> Result<RecentStats, DbError> {
        self.recent_stats_at(user, baby_id, Utc::now())
    }

    /// Latest feed, diaper and sleep state relative to `now`.
    pub fn recent_stats_at(
        &self,
        user: &UserId,
        baby_id: Option<&BabyId>,
        now: DateTime<Utc>,
    ) -> Result<RecentStats, DbError> {
        let baby = find_baby(&self.conn, user, baby_id)?;
        let mut latest = Vec::new();
        for condition in [
            "a.type = 'feed'",
            "a.type = 'diaper'",
            "a.type = 'sleep' AND a.end_time IS NULL",
            "a.type = 'sleep' AND a.end_time IS NOT NULL",
        ] {
            latest.extend(query_activities(
                &self.conn,
                &format!(
                    "{ACTIVITY_SELECT} WHERE a.baby_id = ? AND {condition} \
                     ORDER BY a.start_time DESC, a.id DESC LIMIT 1"
                ),
                [baby.id.as_str()],
            )?);
        }
        Ok(recent_snapshot(now, &latest))
    }

    fn activities_in_window(
        &self,
        baby_id: &BabyId,
        window: Window,
    ) -> Result<Vec<Activity>, DbError> {
        let start = format_timestamp(window.start);
        let end = format_timestamp(window.end);
        debug!(baby = %baby_id, %start, %end, "loading activities for stats");
        query_activities(
            &self.conn,
            &format!(
                "{ACTIVITY_SELECT} WHERE a.baby_id = ? AND a.start_time >= ? AND a.start_time < ? \
                 ORDER BY a.start_time ASC, a.id ASC"
            ),
            [baby_id.as_str(), start.as_str(), end.as_str()],
        )
    }
}
