//! Activity commands for logging, browsing, editing and deleting entries.

use std::io::Write;

use anyhow::{Context, Result};
use bt_core::{
    Activity, ActivityDetail, ActivityId, ActivityType, BreastSide, DiaperColor, DiaperConsistency,
    DiaperDetail, FeedDetail, FeedMethod, GrowthDetail, HealthDetail, HealthRecordType,
    MilestoneDetail, NewActivity, PumpDetail, SleepDetail, parse_date,
};
use bt_db::{ActivityPage, ActivityQuery};
use clap::{Args, Subcommand};

use super::util::{acting_user, baby_id, format_time, open_database, parse_datetime, write_json};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum ActivityAction {
    /// Log a finished or instantaneous activity.
    Add(AddArgs),
    /// List activities, newest first.
    List(ListArgs),
    /// Show one activity.
    Show(ShowArgs),
    /// Change an activity. Unspecified fields keep their current values.
    Edit(EditArgs),
    /// Delete an activity.
    Delete(DeleteArgs),
}

/// Type-specific fields. Only those matching the activity type are used.
#[derive(Debug, Default, Args)]
pub struct DetailArgs {
    /// Feed method (bottle, breast_left, breast_right, solid).
    #[arg(long)]
    pub method: Option<FeedMethod>,
    /// Pump side (left, right, both).
    #[arg(long)]
    pub side: Option<BreastSide>,
    /// Amount in mL (feed and pump).
    #[arg(long)]
    pub amount_ml: Option<f64>,
    /// Duration in minutes (feed and pump).
    #[arg(long)]
    pub duration_minutes: Option<i64>,
    /// Diaper was wet.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub wet: Option<bool>,
    /// Diaper was dirty.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub dirty: Option<bool>,
    #[arg(long)]
    pub color: Option<DiaperColor>,
    #[arg(long)]
    pub consistency: Option<DiaperConsistency>,
    /// Sleep location.
    #[arg(long)]
    pub location: Option<String>,
    /// Sleep quality from 1 to 5.
    #[arg(long)]
    pub quality: Option<u8>,
    #[arg(long)]
    pub weight_kg: Option<f64>,
    #[arg(long)]
    pub height_cm: Option<f64>,
    #[arg(long)]
    pub head_circumference_cm: Option<f64>,
    /// Health record type (checkup, vaccine, illness).
    #[arg(long)]
    pub record_type: Option<HealthRecordType>,
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long)]
    pub vaccine_name: Option<String>,
    #[arg(long)]
    pub symptoms: Option<String>,
    #[arg(long)]
    pub treatment: Option<String>,
    #[arg(long)]
    pub milestone_type: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

impl DetailArgs {
    /// Builds the detail for `kind`, layering the given flags over `existing`.
    ///
    /// An existing detail of another type is discarded. Returns `None` when
    /// there is nothing to build from, leaving the decision to validation.
    pub fn apply(
        &self,
        kind: ActivityType,
        existing: Option<ActivityDetail>,
    ) -> Option<ActivityDetail> {
        let existing = existing.filter(|detail| detail.kind() == kind);
        match kind {
            ActivityType::Feed => {
                let given = self.method.is_some()
                    || self.amount_ml.is_some()
                    || self.duration_minutes.is_some();
                let mut feed = match existing {
                    Some(ActivityDetail::Feed(feed)) => feed,
                    _ if given => FeedDetail::default(),
                    _ => return None,
                };
                feed.method = self.method.or(feed.method);
                feed.amount_ml = self.amount_ml.or(feed.amount_ml);
                feed.duration_minutes = self.duration_minutes.or(feed.duration_minutes);
                Some(ActivityDetail::Feed(feed))
            }
            ActivityType::Pump => {
                let given = self.side.is_some()
                    || self.amount_ml.is_some()
                    || self.duration_minutes.is_some();
                let mut pump = match existing {
                    Some(ActivityDetail::Pump(pump)) => pump,
                    _ if given => PumpDetail::default(),
                    _ => return None,
                };
                pump.side = self.side.or(pump.side);
                pump.amount_ml = self.amount_ml.or(pump.amount_ml);
                pump.duration_minutes = self.duration_minutes.or(pump.duration_minutes);
                Some(ActivityDetail::Pump(pump))
            }
            ActivityType::Diaper => {
                let given = self.wet.is_some()
                    || self.dirty.is_some()
                    || self.color.is_some()
                    || self.consistency.is_some();
                let mut diaper = match existing {
                    Some(ActivityDetail::Diaper(diaper)) => diaper,
                    _ if given => DiaperDetail::default(),
                    _ => return None,
                };
                diaper.wet = self.wet.unwrap_or(diaper.wet);
                diaper.dirty = self.dirty.unwrap_or(diaper.dirty);
                diaper.color = self.color.or(diaper.color);
                diaper.consistency = self.consistency.or(diaper.consistency);
                Some(ActivityDetail::Diaper(diaper))
            }
            ActivityType::Sleep => {
                let given = self.location.is_some() || self.quality.is_some();
                let mut sleep = match existing {
                    Some(ActivityDetail::Sleep(sleep)) => sleep,
                    _ if given => SleepDetail::default(),
                    _ => return None,
                };
                sleep.location = self.location.clone().or(sleep.location);
                sleep.quality = self.quality.or(sleep.quality);
                Some(ActivityDetail::Sleep(sleep))
            }
            ActivityType::Growth => {
                let given = self.weight_kg.is_some()
                    || self.height_cm.is_some()
                    || self.head_circumference_cm.is_some();
                let mut growth = match existing {
                    Some(ActivityDetail::Growth(growth)) => growth,
                    _ if given => GrowthDetail::default(),
                    _ => return None,
                };
                growth.weight_kg = self.weight_kg.or(growth.weight_kg);
                growth.height_cm = self.height_cm.or(growth.height_cm);
                growth.head_circumference_cm =
                    self.head_circumference_cm.or(growth.head_circumference_cm);
                Some(ActivityDetail::Growth(growth))
            }
            ActivityType::Health => {
                let mut health = match (existing, self.record_type) {
                    (Some(ActivityDetail::Health(health)), _) => health,
                    (_, Some(record_type)) => HealthDetail {
                        record_type,
                        provider: None,
                        vaccine_name: None,
                        symptoms: None,
                        treatment: None,
                    },
                    _ => return None,
                };
                health.record_type = self.record_type.unwrap_or(health.record_type);
                health.provider = self.provider.clone().or(health.provider);
                health.vaccine_name = self.vaccine_name.clone().or(health.vaccine_name);
                health.symptoms = self.symptoms.clone().or(health.symptoms);
                health.treatment = self.treatment.clone().or(health.treatment);
                Some(ActivityDetail::Health(health))
            }
            ActivityType::Milestone => {
                let mut milestone = match (existing, &self.milestone_type) {
                    (Some(ActivityDetail::Milestone(milestone)), _) => milestone,
                    (_, Some(milestone_type)) => MilestoneDetail {
                        milestone_type: milestone_type.clone(),
                        description: None,
                    },
                    _ => return None,
                };
                if let Some(milestone_type) = &self.milestone_type {
                    milestone.milestone_type.clone_from(milestone_type);
                }
                milestone.description = self.description.clone().or(milestone.description);
                Some(ActivityDetail::Milestone(milestone))
            }
        }
    }
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Activity type (feed, pump, diaper, sleep, growth, health, milestone).
    pub kind: ActivityType,
    /// Start time, ISO 8601 or relative ("20 minutes ago").
    #[arg(long, default_value = "now")]
    pub start: String,
    /// End time, ISO 8601 or relative.
    #[arg(long)]
    pub end: Option<String>,
    /// Baby ID (defaults to the most recently added baby).
    #[arg(long)]
    pub baby: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[command(flatten)]
    pub detail: DetailArgs,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Baby ID (defaults to the most recently added baby).
    #[arg(long)]
    pub baby: Option<String>,
    /// Only list activities of this type.
    #[arg(long = "type")]
    pub kind: Option<ActivityType>,
    /// First UTC date to include (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<String>,
    /// Last UTC date to include (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<String>,
    #[arg(long)]
    pub page: Option<u32>,
    /// Results per page (default 20, at most 100).
    #[arg(long)]
    pub page_size: Option<u32>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub id: String,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub id: String,
    /// New activity type. Details of the old type are dropped.
    #[arg(long = "type")]
    pub kind: Option<ActivityType>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    /// Move the activity to another baby.
    #[arg(long)]
    pub baby: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[command(flatten)]
    pub detail: DetailArgs,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub id: String,
}

pub fn run<W: Write>(writer: &mut W, action: &ActivityAction, config: &Config) -> Result<()> {
    match action {
        ActivityAction::Add(args) => add(writer, args, config),
        ActivityAction::List(args) => list(writer, args, config),
        ActivityAction::Show(args) => show(writer, args, config),
        ActivityAction::Edit(args) => edit(writer, args, config),
        ActivityAction::Delete(args) => delete(writer, args, config),
    }
}

fn add<W: Write>(writer: &mut W, args: &AddArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let user = acting_user(&db, config)?;
    let activity = NewActivity {
        baby_id: baby_id(args.baby.as_deref())?,
        kind: args.kind,
        start_time: parse_datetime(&args.start)?,
        end_time: args.end.as_deref().map(parse_datetime).transpose()?,
        notes: args.notes.clone().unwrap_or_default(),
        detail: args.detail.apply(args.kind, None),
    };
    let created = db
        .create_activity(&user, &activity)
        .context("failed to log activity")?;

    if args.json {
        return write_json(writer, &created);
    }
    writeln!(writer, "Logged {} {}", created.kind, created.id)?;
    Ok(())
}

fn list<W: Write>(writer: &mut W, args: &ListArgs, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let user = acting_user(&db, config)?;
    let query = ActivityQuery {
        baby_id: baby_id(args.baby.as_deref())?,
        kind: args.kind,
        from: args.from.as_deref().map(parse_date).transpose()?,
        to: args.to.as_deref().map(parse_date).transpose()?,
        page: args.page,
        page_size: args.page_size,
    };
    let page = db.list_activities(&user, &query)?;

    if args.json {
        return write_json(writer, &page);
    }
    write_page(writer, &page)
}

fn show<W: Write>(writer: &mut W, args: &ShowArgs, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let user = acting_user(&db, config)?;
    let activity = db.get_activity(&user, &ActivityId::new(args.id.as_str())?)?;

    if args.json {
        return write_json(writer, &activity);
    }
    write_activity(writer, &activity)
}

fn edit<W: Write>(writer: &mut W, args: &EditArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let user = acting_user(&db, config)?;
    let id = ActivityId::new(args.id.as_str())?;
    let current = db.get_activity(&user, &id)?;

    let kind = args.kind.unwrap_or(current.kind);
    let replacement = NewActivity {
        baby_id: Some(baby_id(args.baby.as_deref())?.unwrap_or(current.baby_id)),
        kind,
        start_time: match args.start.as_deref() {
            Some(start) => parse_datetime(start)?,
            None => current.start_time,
        },
        end_time: match args.end.as_deref() {
            Some(end) => Some(parse_datetime(end)?),
            None => current.end_time,
        },
        notes: args.notes.clone().unwrap_or(current.notes),
        detail: args.detail.apply(kind, current.detail),
    };
    let updated = db
        .update_activity(&user, &id, &replacement)
        .context("failed to update activity")?;

    if args.json {
        return write_json(writer, &updated);
    }
    writeln!(writer, "Updated {} {}", updated.kind, updated.id)?;
    Ok(())
}

fn delete<W: Write>(writer: &mut W, args: &DeleteArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let user = acting_user(&db, config)?;
    db.delete_activity(&user, &ActivityId::new(args.id.as_str())?)?;
    writeln!(writer, "Deleted activity {}", args.id)?;
    Ok(())
}

/// One-line description of a detail record.
pub fn describe_detail(detail: &ActivityDetail) -> String {
    let mut parts = Vec::new();
    match detail {
        ActivityDetail::Feed(feed) => {
            parts.extend(feed.method.map(|method| method.to_string()));
            parts.extend(feed.amount_ml.map(|amount| format!("{amount} mL")));
            parts.extend(feed.duration_minutes.map(|minutes| format!("{minutes} min")));
        }
        ActivityDetail::Pump(pump) => {
            parts.extend(pump.side.map(|side| side.to_string()));
            parts.extend(pump.amount_ml.map(|amount| format!("{amount} mL")));
            parts.extend(pump.duration_minutes.map(|minutes| format!("{minutes} min")));
        }
        ActivityDetail::Diaper(diaper) => {
            if diaper.wet {
                parts.push("wet".to_string());
            }
            if diaper.dirty {
                parts.push("dirty".to_string());
            }
            parts.extend(diaper.color.map(|color| color.to_string()));
            parts.extend(diaper.consistency.map(|consistency| consistency.to_string()));
        }
        ActivityDetail::Sleep(sleep) => {
            parts.extend(sleep.location.clone());
            parts.extend(sleep.quality.map(|quality| format!("quality {quality}/5")));
        }
        ActivityDetail::Growth(growth) => {
            parts.extend(growth.weight_kg.map(|weight| format!("{weight} kg")));
            parts.extend(growth.height_cm.map(|height| format!("{height} cm")));
            parts.extend(
                growth
                    .head_circumference_cm
                    .map(|head| format!("head {head} cm")),
            );
        }
        ActivityDetail::Health(health) => {
            parts.push(health.record_type.to_string());
            parts.extend(health.vaccine_name.clone());
            parts.extend(health.provider.as_ref().map(|provider| format!("with {provider}")));
        }
        ActivityDetail::Milestone(milestone) => {
            parts.push(milestone.milestone_type.clone());
            parts.extend(milestone.description.clone());
        }
    }
    parts.join(", ")
}

fn write_page<W: Write>(writer: &mut W, page: &ActivityPage) -> Result<()> {
    if page.activities.is_empty() {
        writeln!(writer, "No activities found.")?;
        return Ok(());
    }
    for activity in &page.activities {
        let end = activity.end_time.map_or_else(
            || {
                if activity.kind.is_timed() {
                    "running".to_string()
                } else {
                    "-".to_string()
                }
            },
            format_time,
        );
        let detail = activity
            .detail
            .as_ref()
            .map(describe_detail)
            .unwrap_or_default();
        writeln!(
            writer,
            "{}  {:<9}  {}  {:<20}  {detail}",
            activity.id,
            activity.kind.as_str(),
            format_time(activity.start_time),
            end
        )?;
    }
    writeln!(writer)?;
    writeln!(
        writer,
        "Page {} of {} ({} activities)",
        page.page, page.total_pages, page.total
    )?;
    Ok(())
}

fn write_activity<W: Write>(writer: &mut W, activity: &Activity) -> Result<()> {
    writeln!(writer, "Activity {}", activity.id)?;
    writeln!(writer, "Type:    {}", activity.kind)?;
    writeln!(writer, "Baby:    {}", activity.baby_id)?;
    writeln!(writer, "Start:   {}", format_time(activity.start_time))?;
    match activity.end_time {
        Some(end) => writeln!(writer, "End:     {}", format_time(end))?,
        None if activity.kind.is_timed() => writeln!(writer, "End:     (running)")?,
        None => {}
    }
    if let Some(detail) = &activity.detail {
        writeln!(writer, "Details: {}", describe_detail(detail))?;
    }
    if !activity.notes.is_empty() {
        writeln!(writer, "Notes:   {}", activity.notes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bt_db::{DbError, ErrorKind};
    use insta::assert_snapshot;

    use super::*;
    use crate::commands::util::test_support::config_with_baby;

    fn add_args(kind: ActivityType, start: &str, detail: DetailArgs) -> AddArgs {
        AddArgs {
            kind,
            start: start.to_string(),
            end: None,
            baby: None,
            notes: None,
            detail,
            json: true,
        }
    }

    fn bottle(amount: f64) -> DetailArgs {
        DetailArgs {
            method: Some(FeedMethod::Bottle),
            amount_ml: Some(amount),
            ..DetailArgs::default()
        }
    }

    fn add_json(config: &Config, args: &AddArgs) -> serde_json::Value {
        let mut output = Vec::new();
        add(&mut output, args, config).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
        err.downcast_ref::<DbError>().map(DbError::kind)
    }

    #[test]
    fn add_and_show_feed() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());
        let created = add_json(
            &config,
            &AddArgs {
                notes: Some("after nap".to_string()),
                ..add_args(ActivityType::Feed, "2025-03-10T08:00:00Z", bottle(120.0))
            },
        );
        let id = created["id"].as_str().unwrap().to_string();

        let mut output = Vec::new();
        show(
            &mut output,
            &ShowArgs {
                id: id.clone(),
                json: false,
            },
            &config,
        )
        .unwrap();
        let output = String::from_utf8(output)
            .unwrap()
            .replace(&id, "[ID]")
            .replace(created["baby_id"].as_str().unwrap(), "[BABY]");
        assert_snapshot!(output, @r"
        Activity [ID]
        Type:    feed
        Baby:    [BABY]
        Start:   2025-03-10T08:00:00Z
        End:     (running)
        Details: bottle, 120 mL
        Notes:   after nap
        ");
    }

    #[test]
    fn manual_feed_requires_method() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());
        let detail = DetailArgs {
            amount_ml: Some(90.0),
            ..DetailArgs::default()
        };
        let mut output = Vec::new();
        let err = add(
            &mut output,
            &add_args(ActivityType::Feed, "now", detail),
            &config,
        )
        .unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Validation));
    }

    #[test]
    fn edit_changes_type_and_drops_old_detail() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());
        let created = add_json(
            &config,
            &add_args(ActivityType::Feed, "2025-03-10T08:00:00Z", bottle(60.0)),
        );

        let mut output = Vec::new();
        let args = EditArgs {
            id: created["id"].as_str().unwrap().to_string(),
            kind: Some(ActivityType::Diaper),
            start: None,
            end: None,
            baby: None,
            notes: None,
            detail: DetailArgs {
                wet: Some(true),
                ..DetailArgs::default()
            },
            json: true,
        };
        edit(&mut output, &args, &config).unwrap();
        let updated: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(updated["type"], "diaper");
        assert_eq!(updated["start_time"], created["start_time"]);
        assert_eq!(updated["diaper_data"]["wet"], true);
        assert!(updated.get("feed_data").is_none());
    }

    #[test]
    fn edit_merges_flags_into_existing_detail() {
        let existing = ActivityDetail::Feed(FeedDetail {
            method: Some(FeedMethod::BreastLeft),
            amount_ml: None,
            duration_minutes: Some(12),
        });
        let flags = DetailArgs {
            amount_ml: Some(30.0),
            ..DetailArgs::default()
        };
        assert_eq!(
            flags.apply(ActivityType::Feed, Some(existing)),
            Some(ActivityDetail::Feed(FeedDetail {
                method: Some(FeedMethod::BreastLeft),
                amount_ml: Some(30.0),
                duration_minutes: Some(12),
            }))
        );
        assert_eq!(DetailArgs::default().apply(ActivityType::Health, None), None);
    }

    #[test]
    fn delete_then_show_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());
        let created = add_json(
            &config,
            &add_args(ActivityType::Feed, "1 hour ago", bottle(60.0)),
        );
        let id = created["id"].as_str().unwrap().to_string();

        let mut output = Vec::new();
        delete(&mut output, &DeleteArgs { id: id.clone() }, &config).unwrap();
        let err = show(&mut output, &ShowArgs { id, json: false }, &config).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::NotFound));
    }

    #[test]
    fn list_pages_newest_first() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());
        for hour in 1..=3 {
            add_json(
                &config,
                &add_args(
                    ActivityType::Feed,
                    &format!("2025-03-10T0{hour}:00:00Z"),
                    bottle(f64::from(hour) * 10.0),
                ),
            );
        }

        let mut output = Vec::new();
        let args = ListArgs {
            baby: None,
            kind: Some(ActivityType::Feed),
            from: Some("2025-03-10".to_string()),
            to: Some("2025-03-10".to_string()),
            page: Some(1),
            page_size: Some(2),
            json: true,
        };
        list(&mut output, &args, &config).unwrap();
        let page: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(page["total"], 3);
        assert_eq!(page["total_pages"], 2);
        let activities = page["activities"].as_array().unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0]["feed_data"]["amount_ml"], 30.0);
    }

    #[test]
    fn describes_each_detail() {
        let health = ActivityDetail::Health(HealthDetail {
            record_type: HealthRecordType::Vaccine,
            provider: Some("Dr. Lee".to_string()),
            vaccine_name: Some("MMR".to_string()),
            symptoms: None,
            treatment: None,
        });
        let diaper = ActivityDetail::Diaper(DiaperDetail {
            wet: true,
            dirty: true,
            color: Some(DiaperColor::Yellow),
            consistency: Some(DiaperConsistency::Soft),
        });
        let growth = ActivityDetail::Growth(GrowthDetail {
            weight_kg: Some(5.2),
            height_cm: None,
            head_circumference_cm: Some(38.5),
        });
        assert_snapshot!(describe_detail(&health), @"vaccine, MMR, with Dr. Lee");
        assert_snapshot!(describe_detail(&diaper), @"wet, dirty, yellow, soft");
        assert_snapshot!(describe_detail(&growth), @"5.2 kg, head 38.5 cm");
    }
}
