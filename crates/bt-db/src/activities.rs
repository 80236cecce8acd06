//! The activity log: CRUD over activities and their detail rows.

use bt_core::{
    Activity, ActivityDetail, ActivityId, ActivityType, BabyId, DiaperDetail, FeedDetail,
    GrowthDetail, HealthDetail, MilestoneDetail, NewActivity, PumpDetail, SleepDetail, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, info};

use crate::babies::find_baby;
use crate::{Database, DbError, format_timestamp, parse_timestamp};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Selects an activity joined with every detail table.
///
/// Ownership is enforced through the `babies` join; callers append a `WHERE`
/// clause that filters on `b.user_id` or an already-verified `a.baby_id`.
pub(crate) const ACTIVITY_SELECT: &str = "
    SELECT
        a.id, a.baby_id, a.type, a.start_time, a.end_time, a.notes,
        a.created_at, a.updated_at,
        f.activity_id IS NOT NULL AS has_feed,
        f.feed_type, f.amount_ml AS feed_amount_ml, f.duration_minutes AS feed_duration,
        p.activity_id IS NOT NULL AS has_pump,
        p.breast, p.amount_ml AS pump_amount_ml, p.duration_minutes AS pump_duration,
        d.activity_id IS NOT NULL AS has_diaper,
        d.wet, d.dirty, d.color, d.consistency,
        s.activity_id IS NOT NULL AS has_sleep,
        s.location, s.quality,
        g.activity_id IS NOT NULL AS has_growth,
        g.weight_kg, g.height_cm, g.head_circumference_cm,
        h.activity_id IS NOT NULL AS has_health,
        h.record_type, h.provider, h.vaccine_name, h.symptoms, h.treatment,
        m.activity_id IS NOT NULL AS has_milestone,
        m.milestone_type, m.description
    FROM activities a
    JOIN babies b ON b.id = a.baby_id
    LEFT JOIN feed_activities f ON f.activity_id = a.id
    LEFT JOIN pump_activities p ON p.activity_id = a.id
    LEFT JOIN diaper_activities d ON d.activity_id = a.id
    LEFT JOIN sleep_activities s ON s.activity_id = a.id
    LEFT JOIN growth_measurements g ON g.activity_id = a.id
    LEFT JOIN health_records h ON h.activity_id = a.id
    LEFT JOIN milestones m ON m.activity_id = a.id
";

const DETAIL_TABLES: [&str; 7] = [
    "feed_activities",
    "pump_activities",
    "diaper_activities",
    "sleep_activities",
    "growth_measurements",
    "health_records",
    "milestones",
];

/// Filters and paging for [`Database::list_activities`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityQuery {
    /// Defaults to the user's most recently added baby.
    pub baby_id: Option<BabyId>,
    pub kind: Option<ActivityType>,
    /// Inclusive UTC calendar date.
    pub from: Option<NaiveDate>,
    /// Inclusive UTC calendar date.
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// One page of activities, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityPage {
    pub activities: Vec<Activity>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl Database {
    /// Logs a new activity.
    pub fn create_activity(
        &mut self,
        user: &UserId,
        activity: &NewActivity,
    ) -> Result<Activity, DbError> {
        self.validator.validate_new_activity(activity)?;
        let now = Utc::now();
        let id = ActivityId::generate();

        let tx = self.conn.transaction()?;
        let baby = find_baby(&tx, user, activity.baby_id.as_ref())?;
        let timestamp = format_timestamp(now);
        tx.execute(
            "
            INSERT INTO activities (id, baby_id, type, start_time, end_time, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                id.as_str(),
                baby.id.as_str(),
                activity.kind.as_str(),
                format_timestamp(activity.start_time),
                activity.end_time.map(format_timestamp),
                activity.notes,
                timestamp,
                timestamp,
            ],
        )?;
        if let Some(detail) = &activity.detail {
            insert_detail(&tx, &id, detail)?;
        }
        tx.commit()?;

        info!(activity = %id, kind = %activity.kind, baby = %baby.id, "logged activity");
        self.get_activity(user, &id)
    }

    /// Fetches an activity owned by `user`.
    pub fn get_activity(&self, user: &UserId, id: &ActivityId) -> Result<Activity, DbError> {
        load_activity(&self.conn, user, id)?.ok_or_else(|| DbError::not_found("activity", id.as_str()))
    }

    /// Lists activities for one baby, newest first.
    pub fn list_activities(
        &self,
        user: &UserId,
        query: &ActivityQuery,
    ) -> Result<ActivityPage, DbError> {
        let baby = find_baby(&self.conn, user, query.baby_id.as_ref())?;
        let page = query.page.filter(|&page| page >= 1).unwrap_or(1);
        let page_size = query
            .page_size
            .filter(|&size| size >= 1)
            .map_or(DEFAULT_PAGE_SIZE, |size| size.min(MAX_PAGE_SIZE));

        let mut clauses = vec!["a.baby_id = ?".to_string()];
        let mut values = vec![baby.id.as_str().to_string()];
        if let Some(kind) = query.kind {
            clauses.push("a.type = ?".to_string());
            values.push(kind.as_str().to_string());
        }
        if let Some(from) = query.from {
            clauses.push("a.start_time >= ?".to_string());
            values.push(format_timestamp(utc_midnight(from)));
        }
        // `to` is inclusive; the last representable day has no upper bound.
        if let Some(after) = query.to.and_then(|to| to.succ_opt()) {
            clauses.push("a.start_time < ?".to_string());
            values.push(format_timestamp(utc_midnight(after)));
        }
        let filter = clauses.join(" AND ");

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM activities a WHERE {filter}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;
        let total = u64::try_from(total).unwrap_or(0);

        let offset = u64::from(page - 1) * u64::from(page_size);
        let sql = format!(
            "{ACTIVITY_SELECT} WHERE {filter} ORDER BY a.start_time DESC, a.id DESC LIMIT {page_size} OFFSET {offset}"
        );
        debug!(%sql, "listing activities");
        let activities = query_activities(&self.conn, &sql, params_from_iter(values.iter()))?;

        Ok(ActivityPage {
            activities,
            total,
            page,
            page_size,
            total_pages: total.div_ceil(u64::from(page_size)),
        })
    }

    /// Replaces every field of an activity.
    ///
    /// The old detail row is removed and the new one inserted in the same
    /// transaction, so a type change never leaves a stale detail behind.
    pub fn update_activity(
        &mut self,
        user: &UserId,
        id: &ActivityId,
        activity: &NewActivity,
    ) -> Result<Activity, DbError> {
        self.validator.validate_new_activity(activity)?;
        let now = format_timestamp(Utc::now());

        let tx = self.conn.transaction()?;
        let baby = find_baby(&tx, user, activity.baby_id.as_ref())?;
        let updated = tx.execute(
            "
            UPDATE activities
            SET baby_id = ?, type = ?, start_time = ?, end_time = ?, notes = ?, updated_at = ?
            WHERE id = ? AND baby_id IN (SELECT id FROM babies WHERE user_id = ?)
            ",
            params![
                baby.id.as_str(),
                activity.kind.as_str(),
                format_timestamp(activity.start_time),
                activity.end_time.map(format_timestamp),
                activity.notes,
                now,
                id.as_str(),
                user.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(DbError::not_found("activity", id.as_str()));
        }
        delete_detail(&tx, id)?;
        if let Some(detail) = &activity.detail {
            insert_detail(&tx, id, detail)?;
        }
        tx.commit()?;

        info!(activity = %id, kind = %activity.kind, "updated activity");
        self.get_activity(user, id)
    }

    /// Deletes an activity and its detail row.
    pub fn delete_activity(&mut self, user: &UserId, id: &ActivityId) -> Result<(), DbError> {
        let deleted = self.conn.execute(
            "
            DELETE FROM activities
            WHERE id = ? AND baby_id IN (SELECT id FROM babies WHERE user_id = ?)
            ",
            [id.as_str(), user.as_str()],
        )?;
        if deleted == 0 {
            return Err(DbError::not_found("activity", id.as_str()));
        }
        info!(activity = %id, "deleted activity");
        Ok(())
    }
}

fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

pub(crate) fn load_activity(
    conn: &Connection,
    user: &UserId,
    id: &ActivityId,
) -> Result<Option<Activity>, DbError> {
    conn.query_row(
        &format!("{ACTIVITY_SELECT} WHERE a.id = ? AND b.user_id = ?"),
        [id.as_str(), user.as_str()],
        |row| Ok(activity_from_row(row)),
    )
    .optional()?
    .transpose()
}

pub(crate) fn query_activities<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Activity>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(activity_from_row(row)))?;
    let mut activities = Vec::new();
    for row in rows {
        activities.push(row??);
    }
    Ok(activities)
}

pub(crate) fn insert_detail(
    conn: &Connection,
    id: &ActivityId,
    detail: &ActivityDetail,
) -> Result<(), DbError> {
    let id = id.as_str();
    match detail {
        ActivityDetail::Feed(feed) => conn.execute(
            "INSERT INTO feed_activities (activity_id, feed_type, amount_ml, duration_minutes) VALUES (?, ?, ?, ?)",
            params![id, feed.method.map(|m| m.as_str()), feed.amount_ml, feed.duration_minutes],
        )?,
        ActivityDetail::Pump(pump) => conn.execute(
            "INSERT INTO pump_activities (activity_id, breast, amount_ml, duration_minutes) VALUES (?, ?, ?, ?)",
            params![id, pump.side.map(|s| s.as_str()), pump.amount_ml, pump.duration_minutes],
        )?,
        ActivityDetail::Diaper(diaper) => conn.execute(
            "INSERT INTO diaper_activities (activity_id, wet, dirty, color, consistency) VALUES (?, ?, ?, ?, ?)",
            params![
                id,
                diaper.wet,
                diaper.dirty,
                diaper.color.map(|c| c.as_str()),
                diaper.consistency.map(|c| c.as_str()),
            ],
        )?,
        ActivityDetail::Sleep(sleep) => conn.execute(
            "INSERT INTO sleep_activities (activity_id, location, quality) VALUES (?, ?, ?)",
            params![id, sleep.location, sleep.quality],
        )?,
        ActivityDetail::Growth(growth) => conn.execute(
            "INSERT INTO growth_measurements (activity_id, weight_kg, height_cm, head_circumference_cm) VALUES (?, ?, ?, ?)",
            params![id, growth.weight_kg, growth.height_cm, growth.head_circumference_cm],
        )?,
        ActivityDetail::Health(health) => conn.execute(
            "INSERT INTO health_records (activity_id, record_type, provider, vaccine_name, symptoms, treatment) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                health.record_type.as_str(),
                health.provider,
                health.vaccine_name,
                health.symptoms,
                health.treatment,
            ],
        )?,
        ActivityDetail::Milestone(milestone) => conn.execute(
            "INSERT INTO milestones (activity_id, milestone_type, description) VALUES (?, ?, ?)",
            params![id, milestone.milestone_type, milestone.description],
        )?,
    };
    Ok(())
}

/// Removes the activity's detail row, whichever table it lives in.
pub(crate) fn delete_detail(conn: &Connection, id: &ActivityId) -> Result<(), DbError> {
    for table in DETAIL_TABLES {
        conn.execute(
            &format!("DELETE FROM {table} WHERE activity_id = ?"),
            [id.as_str()],
        )?;
    }
    Ok(())
}

fn activity_from_row(row: &Row<'_>) -> Result<Activity, DbError> {
    let id: String = row.get("id")?;
    let kind = parse_column::<ActivityType>(&id, "type", row.get("type")?)?;
    let start_time: String = row.get("start_time")?;
    let end_time: Option<String> = row.get("end_time")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Activity {
        baby_id: BabyId::new(row.get::<_, String>("baby_id")?)?,
        kind,
        start_time: parse_timestamp(&start_time, &id)?,
        end_time: end_time
            .map(|end| parse_timestamp(&end, &id))
            .transpose()?,
        notes: row.get("notes")?,
        created_at: parse_timestamp(&created_at, &id)?,
        updated_at: parse_timestamp(&updated_at, &id)?,
        detail: detail_from_row(row, &id, kind)?,
        id: ActivityId::new(id)?,
    })
}

/// Reads the detail columns for `kind`, ignoring the other tables.
fn detail_from_row(
    row: &Row<'_>,
    id: &str,
    kind: ActivityType,
) -> Result<Option<ActivityDetail>, DbError> {
    let detail = match kind {
        ActivityType::Feed if row.get("has_feed")? => ActivityDetail::Feed(FeedDetail {
            method: parse_optional(id, "feed_type", row.get("feed_type")?)?,
            amount_ml: row.get("feed_amount_ml")?,
            duration_minutes: row.get("feed_duration")?,
        }),
        ActivityType::Pump if row.get("has_pump")? => ActivityDetail::Pump(PumpDetail {
            side: parse_optional(id, "breast", row.get("breast")?)?,
            amount_ml: row.get("pump_amount_ml")?,
            duration_minutes: row.get("pump_duration")?,
        }),
        ActivityType::Diaper if row.get("has_diaper")? => ActivityDetail::Diaper(DiaperDetail {
            wet: row.get("wet")?,
            dirty: row.get("dirty")?,
            color: parse_optional(id, "color", row.get("color")?)?,
            consistency: parse_optional(id, "consistency", row.get("consistency")?)?,
        }),
        ActivityType::Sleep if row.get("has_sleep")? => ActivityDetail::Sleep(SleepDetail {
            location: row.get("location")?,
            quality: row.get("quality")?,
        }),
        ActivityType::Growth if row.get("has_growth")? => ActivityDetail::Growth(GrowthDetail {
            weight_kg: row.get("weight_kg")?,
            height_cm: row.get("height_cm")?,
            head_circumference_cm: row.get("head_circumference_cm")?,
        }),
        ActivityType::Health if row.get("has_health")? => ActivityDetail::Health(HealthDetail {
            record_type: parse_column(id, "record_type", row.get("record_type")?)?,
            provider: row.get("provider")?,
            vaccine_name: row.get("vaccine_name")?,
            symptoms: row.get("symptoms")?,
            treatment: row.get("treatment")?,
        }),
        ActivityType::Milestone if row.get("has_milestone")? => {
            ActivityDetail::Milestone(MilestoneDetail {
                milestone_type: row.get("milestone_type")?,
                description: row.get("description")?,
            })
        }
        _ => return Ok(None),
    };
    Ok(Some(detail))
}

fn parse_column<T: FromStr>(id: &str, column: &'static str, value: String) -> Result<T, DbError> {
    value.parse().map_err(|_| DbError::InvalidColumn {
        id: id.to_string(),
        column,
        value,
    })
}

fn parse_optional<T: FromStr>(
    id: &str,
    column: &'static str,
    value: Option<String>,
) -> Result<Option<T>, DbError> {
    value.map(|value| parse_column(id, column, value)).transpose()
}

#[cfg(test)]
mod tests {
    use bt_core::{DiaperColor, FeedMethod, HealthRecordType};

    use super::*;
    use crate::ErrorKind;
    use crate::test_support::db_with_baby;

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    fn birth() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn bottle(start: &str, amount: f64) -> NewActivity {
        NewActivity {
            baby_id: None,
            kind: ActivityType::Feed,
            start_time: at(start),
            end_time: None,
            notes: String::new(),
            detail: Some(ActivityDetail::Feed(FeedDetail {
                method: Some(FeedMethod::Bottle),
                amount_ml: Some(amount),
                duration_minutes: None,
            })),
        }
    }

    fn wet_diaper(start: &str) -> NewActivity {
        NewActivity {
            baby_id: None,
            kind: ActivityType::Diaper,
            start_time: at(start),
            end_time: None,
            notes: "after nap".to_string(),
            detail: Some(ActivityDetail::Diaper(DiaperDetail {
                wet: true,
                dirty: false,
                color: Some(DiaperColor::Yellow),
                consistency: None,
            })),
        }
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[test]
    fn create_and_get_roundtrip_detail() {
        let (mut db, user, baby) = db_with_baby(birth());
        let created = db
            .create_activity(&user, &bottle("2025-01-02T08:00:00Z", 120.0))
            .unwrap();

        let loaded = db.get_activity(&user, &created.id).unwrap();
        assert_eq!(loaded.baby_id, baby.id);
        assert_eq!(loaded.kind, ActivityType::Feed);
        assert_eq!(loaded.start_time, at("2025-01-02T08:00:00Z"));
        assert_eq!(loaded.detail.as_ref().and_then(ActivityDetail::amount_ml), Some(120.0));
    }

    #[test]
    fn health_record_roundtrip() {
        let (mut db, user, _) = db_with_baby(birth());
        let created = db
            .create_activity(
                &user,
                &NewActivity {
                    baby_id: None,
                    kind: ActivityType::Health,
                    start_time: at("2025-01-03T10:00:00Z"),
                    end_time: None,
                    notes: String::new(),
                    detail: Some(ActivityDetail::Health(HealthDetail {
                        record_type: HealthRecordType::Vaccine,
                        provider: Some("Dr. Okafor".to_string()),
                        vaccine_name: Some("Hep B".to_string()),
                        symptoms: None,
                        treatment: None,
                    })),
                },
            )
            .unwrap();
        let Some(ActivityDetail::Health(health)) = created.detail else {
            panic!("expected health detail");
        };
        assert_eq!(health.record_type, HealthRecordType::Vaccine);
        assert_eq!(health.vaccine_name.as_deref(), Some("Hep B"));
    }

    #[test]
    fn invalid_activity_writes_nothing() {
        let (mut db, user, _) = db_with_baby(birth());
        let err = db
            .create_activity(&user, &bottle("2025-01-02T08:00:00Z", 5000.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(count(&db, "activities"), 0);
    }

    #[test]
    fn changing_type_replaces_detail_row() {
        let (mut db, user, _) = db_with_baby(birth());
        let feed = db
            .create_activity(&user, &bottle("2025-01-02T08:00:00Z", 90.0))
            .unwrap();

        let updated = db
            .update_activity(&user, &feed.id, &wet_diaper("2025-01-02T08:05:00Z"))
            .unwrap();

        assert_eq!(updated.kind, ActivityType::Diaper);
        assert_eq!(updated.notes, "after nap");
        assert_eq!(count(&db, "feed_activities"), 0);
        assert_eq!(count(&db, "diaper_activities"), 1);
    }

    #[test]
    fn failed_update_keeps_original() {
        let (mut db, user, _) = db_with_baby(birth());
        let feed = db
            .create_activity(&user, &bottle("2025-01-02T08:00:00Z", 90.0))
            .unwrap();

        let mut invalid = wet_diaper("2025-01-02T08:05:00Z");
        invalid.detail = None;
        assert!(db.update_activity(&user, &feed.id, &invalid).is_err());
        assert_eq!(db.get_activity(&user, &feed.id).unwrap(), feed);
    }

    #[test]
    fn delete_cascades_detail() {
        let (mut db, user, _) = db_with_baby(birth());
        let feed = db
            .create_activity(&user, &bottle("2025-01-02T08:00:00Z", 90.0))
            .unwrap();
        db.delete_activity(&user, &feed.id).unwrap();

        assert_eq!(count(&db, "feed_activities"), 0);
        assert_eq!(
            db.delete_activity(&user, &feed.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn foreign_activity_looks_missing() {
        let (mut db, owner, _) = db_with_baby(birth());
        let feed = db
            .create_activity(&owner, &bottle("2025-01-02T08:00:00Z", 90.0))
            .unwrap();
        let stranger = db.create_user("stranger").unwrap().id;

        for err in [
            db.get_activity(&stranger, &feed.id).unwrap_err(),
            db.update_activity(&stranger, &feed.id, &bottle("2025-01-02T09:00:00Z", 1.0))
                .unwrap_err(),
            db.delete_activity(&stranger, &feed.id).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
        assert!(db.get_activity(&owner, &feed.id).is_ok());
    }

    #[test]
    fn list_pages_newest_first() {
        let (mut db, user, _) = db_with_baby(birth());
        for hour in 0..5 {
            db.create_activity(&user, &bottle(&format!("2025-01-02T0{hour}:00:00Z"), 10.0))
                .unwrap();
        }
        db.create_activity(&user, &wet_diaper("2025-01-03T00:00:00Z"))
            .unwrap();

        let page = db
            .list_activities(
                &user,
                &ActivityQuery {
                    kind: Some(ActivityType::Feed),
                    page: Some(2),
                    page_size: Some(2),
                    ..ActivityQuery::default()
                },
            )
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        let starts: Vec<_> = page.activities.iter().map(|a| a.start_time).collect();
        assert_eq!(
            starts,
            vec![at("2025-01-02T02:00:00Z"), at("2025-01-02T01:00:00Z")]
        );
    }

    #[test]
    fn list_defaults_and_date_range() {
        let (mut db, user, _) = db_with_baby(birth());
        db.create_activity(&user, &bottle("2025-01-01T23:59:00Z", 10.0))
            .unwrap();
        db.create_activity(&user, &bottle("2025-01-02T12:00:00Z", 10.0))
            .unwrap();
        db.create_activity(&user, &bottle("2025-01-03T00:00:00Z", 10.0))
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let page = db
            .list_activities(
                &user,
                &ActivityQuery {
                    from: Some(day),
                    to: Some(day),
                    page_size: Some(1000),
                    ..ActivityQuery::default()
                },
            )
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 100);
        assert_eq!(page.total, 1);
        assert_eq!(page.activities[0].start_time, at("2025-01-02T12:00:00Z"));

        let all = db.list_activities(&user, &ActivityQuery::default()).unwrap();
        assert_eq!(all.page_size, 20);
        assert_eq!(all.total, 3);

        let open_ended = db
            .list_activities(
                &user,
                &ActivityQuery {
                    to: Some(NaiveDate::MAX),
                    ..ActivityQuery::default()
                },
            )
            .unwrap();
        assert_eq!(open_ended.total, 3);
    }
}
