//! Timer commands: start, stop and list running feed, pump and sleep timers.

use std::io::Write;

use anyhow::{Context, Result};
use bt_core::{
    Activity, ActivityDetail, ActivityId, ActivityType, BreastSide, FeedDetail, FeedMethod,
    PumpDetail, SleepDetail, TimerStart, TimerStop,
};
use bt_db::OpenTimer;
use clap::{Args, Subcommand};
use tracing::debug;

use super::util::{acting_user, baby_id, format_time, open_database, write_json};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum TimerAction {
    /// Start a feed, pump or sleep timer.
    Start(StartArgs),
    /// Stop a running timer.
    Stop(StopArgs),
    /// List running timers.
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Activity type (feed, pump or sleep).
    pub kind: ActivityType,
    /// Baby ID (defaults to the most recently added baby).
    #[arg(long)]
    pub baby: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Feed method (bottle, breast_left, breast_right, solid).
    #[arg(long)]
    pub method: Option<FeedMethod>,
    /// Pump side (left, right, both).
    #[arg(long)]
    pub side: Option<BreastSide>,
    /// Sleep location.
    #[arg(long)]
    pub location: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StopArgs {
    /// ID of the running activity.
    pub id: String,
    /// Final amount in mL (feed and pump).
    #[arg(long)]
    pub amount_ml: Option<f64>,
    /// Sleep quality from 1 to 5.
    #[arg(long)]
    pub quality: Option<u8>,
    /// Replaces the activity's notes when non-empty.
    #[arg(long)]
    pub notes: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only list timers for this baby.
    #[arg(long)]
    pub baby: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, action: &TimerAction, config: &Config) -> Result<()> {
    match action {
        TimerAction::Start(args) => start(writer, args, config),
        TimerAction::Stop(args) => stop(writer, args, config),
        TimerAction::List(args) => list(writer, args, config),
    }
}

fn start<W: Write>(writer: &mut W, args: &StartArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let user = acting_user(&db, config)?;
    let request = TimerStart {
        baby_id: baby_id(args.baby.as_deref())?,
        kind: args.kind,
        notes: args.notes.clone().unwrap_or_default(),
        detail: start_detail(args),
    };
    debug!(?request, "starting timer");
    let activity = db
        .start_timer(&user, &request)
        .context("failed to start timer")?;

    if args.json {
        return write_json(writer, &activity);
    }
    writeln!(
        writer,
        "Started {} timer {} at {}",
        activity.kind,
        activity.id,
        format_time(activity.start_time)
    )?;
    Ok(())
}

/// Detail fields known at the start, if any were given for the type.
fn start_detail(args: &StartArgs) -> Option<ActivityDetail> {
    match args.kind {
        ActivityType::Feed => args.method.map(|method| {
            ActivityDetail::Feed(FeedDetail {
                method: Some(method),
                ..FeedDetail::default()
            })
        }),
        ActivityType::Pump => args.side.map(|side| {
            ActivityDetail::Pump(PumpDetail {
                side: Some(side),
                ..PumpDetail::default()
            })
        }),
        ActivityType::Sleep => args.location.as_ref().map(|location| {
            ActivityDetail::Sleep(SleepDetail {
                location: Some(location.clone()),
                quality: None,
            })
        }),
        _ => None,
    }
}

fn stop<W: Write>(writer: &mut W, args: &StopArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let user = acting_user(&db, config)?;
    let id = ActivityId::new(args.id.as_str())?;
    let request = TimerStop {
        amount_ml: args.amount_ml,
        quality: args.quality,
        notes: args.notes.clone(),
    };
    let activity = db
        .stop_timer(&user, &id, &request)
        .context("failed to stop timer")?;

    if args.json {
        return write_json(writer, &activity);
    }
    write_stopped(writer, &activity)
}

fn write_stopped<W: Write>(writer: &mut W, activity: &Activity) -> Result<()> {
    let minutes = activity.duration().map_or(0, |elapsed| elapsed.num_minutes());
    writeln!(
        writer,
        "Stopped {} timer {} after {minutes} min",
        activity.kind, activity.id
    )?;
    match &activity.detail {
        Some(ActivityDetail::Feed(FeedDetail {
            amount_ml: Some(amount),
            ..
        })
        | ActivityDetail::Pump(PumpDetail {
            amount_ml: Some(amount),
            ..
        })) => writeln!(writer, "Amount: {amount} mL")?,
        Some(ActivityDetail::Sleep(SleepDetail {
            quality: Some(quality),
            ..
        })) => writeln!(writer, "Quality: {quality}/5")?,
        _ => {}
    }
    Ok(())
}

fn list<W: Write>(writer: &mut W, args: &ListArgs, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let user = acting_user(&db, config)?;
    let timers = db.list_open_timers(&user, baby_id(args.baby.as_deref())?.as_ref())?;

    if args.json {
        return write_json(writer, &timers);
    }
    write_timers(writer, &timers)
}

fn write_timers<W: Write>(writer: &mut W, timers: &[OpenTimer]) -> Result<()> {
    if timers.is_empty() {
        writeln!(writer, "No running timers.")?;
        return Ok(());
    }
    for timer in timers {
        writeln!(
            writer,
            "{}  {:<6}  started {}  ({} min)",
            timer.activity.id,
            timer.activity.kind.as_str(),
            format_time(timer.activity.start_time),
            timer.elapsed_minutes
        )?;
    }
    Ok(())
}
