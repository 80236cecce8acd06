//! Timer lifecycle for feed, pump and sleep activities.
//!
//! A running timer is an activity with no `end_time`. Starting and stopping
//! each run in one `IMMEDIATE` transaction so the write lock is held from the
//! first read to the commit. Stopping closes the row with a conditional
//! `UPDATE ... WHERE end_time IS NULL`; losing that race looks the same as
//! stopping an id that does not exist.

use bt_core::{
    Activity, ActivityId, ActivityType, BabyId, TimerStart, TimerStop, UserId, elapsed_minutes,
    stopped_detail,
};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::activities::{
    ACTIVITY_SELECT, delete_detail, insert_detail, load_activity, query_activities,
};
use crate::babies::find_baby;
use crate::{Database, DbError, format_timestamp};

const TIMED_TYPES: &str = "('feed', 'pump', 'sleep')";

/// A running timer and how long it has been going.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenTimer {
    #[serde(flatten)]
    pub activity: Activity,
    pub elapsed_minutes: i64,
}

impl Database {
    /// Starts a timer now.
    pub fn start_timer(&mut self, user: &UserId, start: &TimerStart) -> Result<Activity, DbError> {
        self.start_timer_at(user, start, Utc::now())
    }

    /// Starts a timer at `now`.
    ///
    /// Only the fields known at the start (feed method, pump side, sleep
    /// location) are kept from the supplied detail.
    pub fn start_timer_at(
        &mut self,
        user: &UserId,
        start: &TimerStart,
        now: DateTime<Utc>,
    ) -> Result<Activity, DbError> {
        self.validator.validate_timer_start(start)?;
        let id = ActivityId::generate();
        let timestamp = format_timestamp(now);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let baby = find_baby(&tx, user, start.baby_id.as_ref())?;

        if start.kind == ActivityType::Sleep {
            let running: Option<String> = tx
                .query_row(
                    "
                    SELECT id FROM activities
                    WHERE baby_id = ? AND type = 'sleep' AND end_time IS NULL
                    ORDER BY start_time DESC
                    LIMIT 1
                    ",
                    [baby.id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(activity_id) = running {
                return Err(DbError::TimerAlreadyRunning { activity_id });
            }
        }

        tx.execute(
            "
            INSERT INTO activities (id, baby_id, type, start_time, end_time, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, NULL, ?, ?, ?)
            ",
            params![
                id.as_str(),
                baby.id.as_str(),
                start.kind.as_str(),
                timestamp,
                start.notes,
                timestamp,
                timestamp,
            ],
        )?;
        if let Some(detail) = start.detail.clone() {
            insert_detail(&tx, &id, &detail.start_fields())?;
        }
        let activity = load_activity(&tx, user, &id)?
            .ok_or_else(|| DbError::not_found("activity", id.as_str()))?;
        tx.commit()?;

        info!(activity = %id, kind = %start.kind, baby = %baby.id, "started timer");
        Ok(activity)
    }

    /// Stops a running timer now.
    pub fn stop_timer(
        &mut self,
        user: &UserId,
        id: &ActivityId,
        stop: &TimerStop,
    ) -> Result<Activity, DbError> {
        self.stop_timer_at(user, id, stop, Utc::now())
    }

    /// Stops a running timer at `now`.
    ///
    /// The end time is never earlier than the start time. The elapsed whole
    /// minutes are written to the feed or pump detail, final amounts and
    /// quality overwrite earlier values, and non-empty notes replace the
    /// activity's notes. A detail row is created if the timer had none.
    pub fn stop_timer_at(
        &mut self,
        user: &UserId,
        id: &ActivityId,
        stop: &TimerStop,
        now: DateTime<Utc>,
    ) -> Result<Activity, DbError> {
        let not_found = || DbError::not_found("running timer", id.as_str());
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(current) = load_activity(&tx, user, id)? else {
            return Err(not_found());
        };
        if !current.kind.is_timed() || !current.is_open() {
            return Err(not_found());
        }
        self.validator.validate_timer_stop(current.kind, stop)?;

        let end = now.max(current.start_time);
        let minutes = elapsed_minutes(current.start_time, end);
        let notes = stop.notes.as_deref().filter(|notes| !notes.is_empty());
        let closed = tx.execute(
            &format!(
                "
                UPDATE activities
                SET end_time = ?1, notes = COALESCE(?2, notes), updated_at = ?3
                WHERE id = ?4
                  AND end_time IS NULL
                  AND type IN {TIMED_TYPES}
                  AND baby_id IN (SELECT id FROM babies WHERE user_id = ?5)
                "
            ),
            params![
                format_timestamp(end),
                notes,
                format_timestamp(now),
                id.as_str(),
                user.as_str(),
            ],
        )?;
        if closed == 0 {
            return Err(not_found());
        }

        if let Some(detail) = stopped_detail(current.kind, current.detail, minutes, stop) {
            delete_detail(&tx, id)?;
            insert_detail(&tx, id, &detail)?;
        }
        let activity = load_activity(&tx, user, id)?.ok_or_else(not_found)?;
        tx.commit()?;

        info!(
            activity = %id,
            kind = %activity.kind,
            duration_minutes = minutes,
            "stopped timer"
        );
        Ok(activity)
    }

    /// Lists running timers, newest first.
    ///
    /// Without a baby id, timers for all of the user's babies are listed.
    pub fn list_open_timers(
        &self,
        user: &UserId,
        baby_id: Option<&BabyId>,
    ) -> Result<Vec<OpenTimer>, DbError> {
        self.list_open_timers_at(user, baby_id, Utc::now())
    }

    /// Lists running timers with elapsed time measured at `now`.
    pub fn list_open_timers_at(
        &self,
        user: &UserId,
        baby_id: Option<&BabyId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OpenTimer>, DbError> {
        let filter = format!("b.user_id = ?1 AND a.end_time IS NULL AND a.type IN {TIMED_TYPES}");
        let order = "ORDER BY a.start_time DESC, a.id DESC";
        let activities = match baby_id {
            Some(baby_id) => {
                let baby = find_baby(&self.conn, user, Some(baby_id))?;
                query_activities(
                    &self.conn,
                    &format!("{ACTIVITY_SELECT} WHERE {filter} AND a.baby_id = ?2 {order}"),
                    [user.as_str(), baby.id.as_str()],
                )?
            }
            None => query_activities(
                &self.conn,
                &format!("{ACTIVITY_SELECT} WHERE {filter} {order}"),
                [user.as_str()],
            )?,
        };
        debug!(count = activities.len(), "listed open timers");

        Ok(activities
            .into_iter()
            .map(|activity| OpenTimer {
                elapsed_minutes: elapsed_minutes(activity.start_time, now),
                activity,
            })
            .collect())
    }
}
