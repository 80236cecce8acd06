//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use bt_core::{BabyId, TzOffset, UserId};
use bt_db::Database;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;

use crate::Config;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either ISO 8601 or relative time.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Relative: "now", "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    parse_datetime_at(s, Utc::now())
}

/// Like [`parse_datetime`], resolving relative times against `now`.
pub fn parse_datetime_at(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if s == "now" {
        return Ok(now);
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Formats an instant for human-readable output.
pub fn format_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Opens the configured database, creating its directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Resolves the acting user from the configured username.
pub fn acting_user(db: &Database, config: &Config) -> Result<UserId> {
    let Some(username) = config.user.as_deref() else {
        anyhow::bail!(
            "no user configured. Pass --user NAME, set BT_USER, or add `user = \"NAME\"` to the config file"
        );
    };
    let user = db.find_user(username)?;
    tracing::debug!(user = %user.id, %username, "resolved acting user");
    Ok(user.id)
}

/// Parses an optional `--baby` argument.
pub fn baby_id(arg: Option<&str>) -> Result<Option<BabyId>> {
    Ok(arg.map(BabyId::new).transpose()?)
}

/// Picks the explicit offset, else the configured one, else the host's.
pub fn tz_offset(arg: Option<i32>, config: &Config) -> Result<TzOffset> {
    Ok(match arg {
        Some(minutes) => TzOffset::from_browser_minutes(minutes)?,
        None => config.default_tz()?,
    })
}

/// Writes `value` as pretty JSON followed by a newline.
pub fn write_json<W: std::io::Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use bt_core::{Baby, NewBaby};
    use chrono::NaiveDate;

    use super::*;

    /// A config pointing at `dir/bt.db` acting as "parent", with one baby.
    pub fn config_with_baby(dir: &Path) -> (Config, Baby) {
        let config = Config {
            database_path: dir.join("bt.db"),
            user: Some("parent".to_string()),
            tz_offset: Some(0),
        };
        let mut db = Database::open(&config.database_path).unwrap();
        let user = db.create_user("parent").unwrap().id;
        let baby = db
            .create_baby(
                &user,
                &NewBaby {
                    name: "Ada".to_string(),
                    birth_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    birth_weight_kg: None,
                    birth_height_cm: None,
                    sleep_tracking: true,
                },
            )
            .unwrap();
        (config, baby)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_datetime_at("2026-01-15T10:30:00-05:00", now()).unwrap();
        assert_eq!(format_time(parsed), "2026-01-15T15:30:00Z");
    }

    #[test]
    fn parses_relative_times() {
        assert_eq!(
            format_time(parse_datetime_at("2 hours ago", now()).unwrap()),
            "2026-01-15T10:00:00Z"
        );
        assert_eq!(
            format_time(parse_datetime_at("1 minute ago", now()).unwrap()),
            "2026-01-15T11:59:00Z"
        );
        assert_eq!(
            format_time(parse_datetime_at("1 week ago", now()).unwrap()),
            "2026-01-08T12:00:00Z"
        );
        assert_eq!(parse_datetime_at("now", now()).unwrap(), now());
    }

    #[test]
    fn rejects_garbage_and_huge_values() {
        assert!(parse_datetime_at("yesterday-ish", now()).is_err());
        assert!(parse_datetime_at("99999999 weeks ago", now()).is_err());
    }

    #[test]
    fn acting_user_requires_configuration() {
        let db = Database::open_in_memory().unwrap();
        let config = Config {
            user: None,
            ..Config::default()
        };
        let err = acting_user(&db, &config).unwrap_err();
        assert!(err.to_string().contains("no user configured"));
    }

    #[test]
    fn unknown_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let config = Config {
            user: Some("ghost".to_string()),
            ..Config::default()
        };
        let err = acting_user(&db, &config).unwrap_err();
        let db_err = err.downcast_ref::<bt_db::DbError>().unwrap();
        assert_eq!(db_err.kind(), bt_db::ErrorKind::NotFound);
    }
}
