//! Storage layer for the baby tracker.
//!
//! Provides persistence for users, babies and activities using `rusqlite`,
//! plus the timer and statistics operations built on top of them.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! This means a `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Each CLI invocation opens its own.
//!
//! # Ownership
//!
//! Every operation takes the acting [`UserId`]. Babies and activities that belong to
//! another user are reported exactly like missing ones ([`DbError::NotFound`]).
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision and a
//! `Z` suffix (e.g., `2024-01-15T10:30:00.000Z`), so lexicographic ordering matches
//! chronological ordering. Birth dates are stored as `YYYY-MM-DD`.
//!
//! ## Detail Tables
//!
//! Each activity type has its own detail table keyed by `activity_id`, with
//! `ON DELETE CASCADE` back to `activities`. An activity has at most one detail row,
//! always in the table matching its `type`.

mod activities;
mod babies;
mod stats;
mod timer;

use std::path::Path;

use bt_core::{UserId, ValidationError, Validator};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub use activities::{ActivityPage, ActivityQuery};
pub use timer::OpenTimer;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The record does not exist or belongs to another user.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    /// A sleep timer is already running for the baby.
    #[error("a sleep timer is already running for this baby (activity {activity_id})")]
    TimerAlreadyRunning { activity_id: String },
    /// The username is taken.
    #[error("user already exists: {username}")]
    UserExists { username: String },
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {id}: {timestamp}")]
    TimestampParse {
        id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value could not be decoded.
    #[error("invalid {column} for {id}: {value}")]
    InvalidColumn {
        id: String,
        column: &'static str,
        value: String,
    },
}

/// Coarse classification of a [`DbError`] for callers that map errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl DbError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TimerAlreadyRunning { .. } | Self::UserExists { .. } => ErrorKind::Conflict,
            Self::Sqlite(_) | Self::TimestampParse { .. } | Self::InvalidColumn { .. } => {
                ErrorKind::Internal
            }
        }
    }

    fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
    validator: Validator,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn,
            validator: Validator::default(),
        };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            validator: Validator::default(),
        };
        db.init()?;
        Ok(db)
    }

    /// Replaces the validator used for every write.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS babies (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                birth_date TEXT NOT NULL,
                birth_weight_kg REAL,
                birth_height_cm REAL,
                sleep_tracking INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_babies_user ON babies(user_id, created_at);

            -- Activities: one row per logged event
            -- start_time/end_time: RFC 3339 UTC with milliseconds
            -- end_time IS NULL: timer still running (feed, pump, sleep)
            CREATE TABLE IF NOT EXISTS activities (
                id TEXT PRIMARY KEY,
                baby_id TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN
                    ('feed', 'pump', 'diaper', 'sleep', 'growth', 'health', 'milestone')),
                start_time TEXT NOT NULL,
                end_time TEXT,
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (baby_id) REFERENCES babies(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_activities_baby_start ON activities(baby_id, start_time);
            CREATE INDEX IF NOT EXISTS idx_activities_type ON activities(type);

            CREATE TABLE IF NOT EXISTS feed_activities (
                activity_id TEXT PRIMARY KEY,
                feed_type TEXT,
                amount_ml REAL,
                duration_minutes INTEGER,
                FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS pump_activities (
                activity_id TEXT PRIMARY KEY,
                breast TEXT,
                amount_ml REAL,
                duration_minutes INTEGER,
                FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS diaper_activities (
                activity_id TEXT PRIMARY KEY,
                wet INTEGER NOT NULL DEFAULT 0,
                dirty INTEGER NOT NULL DEFAULT 0,
                color TEXT,
                consistency TEXT,
                FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS sleep_activities (
                activity_id TEXT PRIMARY KEY,
                location TEXT,
                quality INTEGER,
                FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS growth_measurements (
                activity_id TEXT PRIMARY KEY,
                weight_kg REAL,
                height_cm REAL,
                head_circumference_cm REAL,
                FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS health_records (
                activity_id TEXT PRIMARY KEY,
                record_type TEXT NOT NULL,
                provider TEXT,
                vaccine_name TEXT,
                symptoms TEXT,
                treatment TEXT,
                FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS milestones (
                activity_id TEXT PRIMARY KEY,
                milestone_type TEXT NOT NULL,
                description TEXT,
                FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE
            );
            ",
        )?;
        Ok(())
    }

    /// Registers a new user.
    pub fn create_user(&mut self, username: &str) -> Result<User, DbError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::Empty { field: "username" }.into());
        }
        if self.find_user_optional(username)?.is_some() {
            return Err(DbError::UserExists {
                username: username.to_string(),
            });
        }

        let user = User {
            id: UserId::generate(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        let now = format_timestamp(user.created_at);
        self.conn.execute(
            "INSERT INTO users (id, username, created_at, updated_at) VALUES (?, ?, ?, ?)",
            params![user.id.as_str(), user.username, now, now],
        )?;
        info!(user = %user.username, "created user");
        Ok(user)
    }

    /// Looks up a user by name.
    pub fn find_user(&self, username: &str) -> Result<User, DbError> {
        self.find_user_optional(username)?
            .ok_or_else(|| DbError::not_found("user", username))
    }

    fn find_user_optional(&self, username: &str) -> Result<Option<User>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?",
                [username.trim()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, username, created_at)| {
            Ok(User {
                created_at: parse_timestamp(&created_at, &id)?,
                id: UserId::new(id)?,
                username,
            })
        })
        .transpose()
    }

    /// Deletes a user together with their babies and activities.
    pub fn delete_user(&mut self, username: &str) -> Result<(), DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM users WHERE username = ?", [username.trim()])?;
        if deleted == 0 {
            return Err(DbError::not_found("user", username));
        }
        info!(user = %username, "deleted user and all their data");
        Ok(())
    }
}

pub(crate) fn parse_timestamp(timestamp: &str, id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_date(value: &str, id: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| DbError::InvalidColumn {
        id: id.to_string(),
        column: "birth_date",
        value: value.to_string(),
    })
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use bt_core::{Baby, NewBaby, UserId};
    use chrono::NaiveDate;

    use crate::Database;

    pub fn db_with_baby(birth_date: NaiveDate) -> (Database, UserId, Baby) {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let user = db.create_user("parent").expect("create user").id;
        let baby = db
            .create_baby(
                &user,
                &NewBaby {
                    name: "Ada".to_string(),
                    birth_date,
                    birth_weight_kg: Some(3.4),
                    birth_height_cm: None,
                    sleep_tracking: true,
                },
            )
            .expect("create baby");
        (db, user, baby)
    }
}
