//! Stats commands for daily, recent and weekly summaries.

use std::io::Write;

use anyhow::Result;
use bt_core::{ActivityType, DailyStats, RecentStats, TzOffset, WeeklyStats, parse_date};
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};

use super::util::{acting_user, baby_id, format_time, open_database, tz_offset, write_json};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum StatsAction {
    /// Counts, totals and last times for one local day.
    Daily(PeriodArgs),
    /// Latest feed, diaper and sleep relative to now.
    Recent(RecentArgs),
    /// Averages and a day-by-day breakdown for the seven days ending on a date.
    Weekly(PeriodArgs),
}

#[derive(Debug, Args)]
pub struct PeriodArgs {
    /// Local calendar date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<String>,
    /// Browser-style offset in minutes, positive when local time is behind UTC.
    #[arg(long, allow_hyphen_values = true)]
    pub tz_offset: Option<i32>,
    /// Baby ID (defaults to the most recently added baby).
    #[arg(long)]
    pub baby: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RecentArgs {
    /// Baby ID (defaults to the most recently added baby).
    #[arg(long)]
    pub baby: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, action: &StatsAction, config: &Config) -> Result<()> {
    match action {
        StatsAction::Daily(args) => {
            let db = open_database(config)?;
            let user = acting_user(&db, config)?;
            let (date, tz) = resolve_period(args, config)?;
            let stats = db.daily_stats(&user, baby_id(args.baby.as_deref())?.as_ref(), date, tz)?;
            if args.json {
                return write_json(writer, &stats);
            }
            write_daily(writer, &stats)
        }
        StatsAction::Weekly(args) => {
            let db = open_database(config)?;
            let user = acting_user(&db, config)?;
            let (date, tz) = resolve_period(args, config)?;
            let stats = db.weekly_stats(&user, baby_id(args.baby.as_deref())?.as_ref(), date, tz)?;
            if args.json {
                return write_json(writer, &stats);
            }
            write_weekly(writer, &stats)
        }
        StatsAction::Recent(args) => {
            let db = open_database(config)?;
            let user = acting_user(&db, config)?;
            let stats = db.recent_stats(&user, baby_id(args.baby.as_deref())?.as_ref())?;
            if args.json {
                return write_json(writer, &stats);
            }
            write_recent(writer, &stats)
        }
    }
}

/// The requested date, or today in the caller's offset.
fn resolve_period(args: &PeriodArgs, config: &Config) -> Result<(NaiveDate, TzOffset)> {
    let tz = tz_offset(args.tz_offset, config)?;
    let date = match args.date.as_deref() {
        Some(value) => parse_date(value)?,
        None => tz.local_date(Utc::now()),
    };
    Ok((date, tz))
}

fn write_daily<W: Write>(writer: &mut W, stats: &DailyStats) -> Result<()> {
    writeln!(writer, "DAILY SUMMARY {}", stats.date)?;
    writeln!(writer)?;
    for kind in ActivityType::ALL {
        let count = stats.counts.get(&kind).copied().unwrap_or_default();
        let last = stats
            .last_activities
            .get(&kind)
            .copied()
            .flatten()
            .map_or_else(|| "-".to_string(), format_time);
        writeln!(writer, "{:<10} {count:>3}   last {last}", kind.as_str())?;
    }
    writeln!(writer)?;
    writeln!(writer, "Fed:    {:.0} mL", stats.totals.feed_amount_ml)?;
    writeln!(writer, "Pumped: {:.0} mL", stats.totals.pump_amount_ml)?;
    writeln!(writer, "Slept:  {:.1} h", stats.totals.sleep_hours)?;
    if let Some(diapers) = &stats.diaper_breakdown {
        writeln!(writer, "Diapers: {} wet, {} dirty", diapers.wet, diapers.dirty)?;
    }
    Ok(())
}

fn write_recent<W: Write>(writer: &mut W, stats: &RecentStats) -> Result<()> {
    match &stats.last_feed {
        Some(feed) => {
            let method = feed.method.map_or("feed", |method| method.as_str());
            let amount = feed
                .amount_ml
                .map(|amount| format!(", {amount:.0} mL"))
                .unwrap_or_default();
            writeln!(
                writer,
                "Last feed:   {:.1} h ago ({method}{amount})",
                feed.hours_ago
            )?;
        }
        None => writeln!(writer, "Last feed:   none")?,
    }
    match &stats.last_diaper {
        Some(diaper) => {
            let contents = match (diaper.wet, diaper.dirty) {
                (true, true) => "wet and dirty",
                (true, false) => "wet",
                (false, true) => "dirty",
                (false, false) => "dry",
            };
            writeln!(
                writer,
                "Last diaper: {:.1} h ago ({contents})",
                diaper.hours_ago
            )?;
        }
        None => writeln!(writer, "Last diaper: none")?,
    }
    if stats.currently_sleeping {
        writeln!(writer, "Sleep:       sleeping now")?;
    } else if let Some(sleep) = &stats.last_sleep {
        writeln!(
            writer,
            "Sleep:       awake since {} (slept {:.1} h)",
            format_time(sleep.ended),
            sleep.duration_hours
        )?;
    } else {
        writeln!(writer, "Sleep:       no sleep logged")?;
    }
    Ok(())
}

fn write_weekly<W: Write>(writer: &mut W, stats: &WeeklyStats) -> Result<()> {
    writeln!(
        writer,
        "WEEKLY SUMMARY {} to {}",
        stats.start_date, stats.end_date
    )?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<10}  {:>6}  {:>7}  {:>7}",
        "Date", "Feeds", "Diapers", "Sleep h"
    )?;
    for day in &stats.daily_breakdown {
        writeln!(
            writer,
            "{:<10}  {:>6}  {:>7}  {:>7.1}",
            day.date, day.feed_count, day.diaper_count, day.sleep_duration_hours
        )?;
    }
    writeln!(writer)?;
    writeln!(writer, "Daily averages:")?;
    for (name, value) in &stats.daily_averages {
        writeln!(writer, "  {name:<24} {value:.2}")?;
    }
    if let Some(growth) = &stats.growth_this_week {
        if let Some(weight) = growth.weight_change_kg {
            writeln!(writer, "Weight change: {weight:+.2} kg")?;
        }
        if let Some(height) = growth.height_change_cm {
            writeln!(writer, "Height change: {height:+.1} cm")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bt_core::{ActivityDetail, DiaperDetail, NewActivity, UserId};
    use bt_db::{Database, DbError, ErrorKind};
    use chrono::DateTime;
    use insta::assert_snapshot;

    use super::*;
    use crate::commands::util::test_support::config_with_baby;

    fn log_diaper(config: &Config, start: &str) {
        let mut db = Database::open(&config.database_path).unwrap();
        let user: UserId = db.find_user("parent").unwrap().id;
        db.create_activity(
            &user,
            &NewActivity {
                baby_id: None,
                kind: ActivityType::Diaper,
                start_time: DateTime::parse_from_rfc3339(start)
                    .unwrap()
                    .with_timezone(&Utc),
                end_time: None,
                notes: String::new(),
                detail: Some(ActivityDetail::Diaper(DiaperDetail {
                    wet: true,
                    dirty: true,
                    ..DiaperDetail::default()
                })),
            },
        )
        .unwrap();
    }

    fn daily(date: &str, tz_offset: Option<i32>, json: bool) -> PeriodArgs {
        PeriodArgs {
            date: Some(date.to_string()),
            tz_offset,
            baby: None,
            json,
        }
    }

    #[test]
    fn daily_text_summary() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());
        log_diaper(&config, "2025-03-10T08:15:00Z");

        let mut output = Vec::new();
        run(
            &mut output,
            &StatsAction::Daily(daily("2025-03-10", None, false)),
            &config,
        )
        .unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        DAILY SUMMARY 2025-03-10

        feed         0   last -
        pump         0   last -
        diaper       1   last 2025-03-10T08:15:00Z
        sleep        0   last -
        growth       0   last -
        health       0   last -
        milestone    0   last -

        Fed:    0 mL
        Pumped: 0 mL
        Slept:  0.0 h
        Diapers: 1 wet, 1 dirty
        ");
    }

    #[test]
    fn daily_json_uses_offset() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());
        // 02:00 UTC on the 11th is still the 10th in UTC-5.
        log_diaper(&config, "2025-03-11T02:00:00Z");

        let mut output = Vec::new();
        run(
            &mut output,
            &StatsAction::Daily(daily("2025-03-10", Some(300), true)),
            &config,
        )
        .unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(stats["counts"]["diaper"], 1);
        assert_eq!(stats["diaper_breakdown"]["wet"], 1);
    }

    #[test]
    fn bad_inputs_are_validation_errors() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());

        for args in [
            daily("10/03/2025", None, false),
            daily("2025-03-10", Some(900), false),
            daily("2024-12-31", None, false),
        ] {
            let mut output = Vec::new();
            let err = run(&mut output, &StatsAction::Weekly(args), &config).unwrap_err();
            let kind = err
                .downcast_ref::<bt_core::ValidationError>()
                .map(|_| ErrorKind::Validation)
                .or_else(|| err.downcast_ref::<DbError>().map(DbError::kind));
            assert_eq!(kind, Some(ErrorKind::Validation), "{err:#}");
        }
    }

    #[test]
    fn recent_without_activity() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());

        let mut output = Vec::new();
        run(
            &mut output,
            &StatsAction::Recent(RecentArgs {
                baby: None,
                json: false,
            }),
            &config,
        )
        .unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Last feed:   none
        Last diaper: none
        Sleep:       no sleep logged
        ");
    }
}
