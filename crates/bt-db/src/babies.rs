//! Baby profiles and ownership checks.

use bt_core::{Baby, BabyId, NewBaby, UserId};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::{Database, DbError, format_date, format_timestamp, parse_date, parse_timestamp};

const BABY_COLUMNS: &str = "id, user_id, name, birth_date, birth_weight_kg, birth_height_cm, \
                            sleep_tracking, created_at, updated_at";

impl Database {
    /// Registers a baby for `user`.
    pub fn create_baby(&mut self, user: &UserId, baby: &NewBaby) -> Result<Baby, DbError> {
        self.validator.validate_new_baby(baby)?;
        let now = Utc::now();
        let created = Baby {
            id: BabyId::generate(),
            user_id: user.clone(),
            name: baby.name.trim().to_string(),
            birth_date: baby.birth_date,
            birth_weight_kg: baby.birth_weight_kg,
            birth_height_cm: baby.birth_height_cm,
            sleep_tracking: baby.sleep_tracking,
            created_at: now,
            updated_at: now,
        };
        let timestamp = format_timestamp(now);
        self.conn.execute(
            &format!("INSERT INTO babies ({BABY_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                created.id.as_str(),
                user.as_str(),
                created.name,
                format_date(created.birth_date),
                created.birth_weight_kg,
                created.birth_height_cm,
                created.sleep_tracking,
                timestamp,
                timestamp,
            ],
        )?;
        info!(baby = %created.id, name = %created.name, "created baby");
        Ok(created)
    }

    /// Lists the user's babies, most recently added first.
    pub fn list_babies(&self, user: &UserId) -> Result<Vec<Baby>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {BABY_COLUMNS}
            FROM babies
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "
        ))?;
        let rows = stmt.query_map([user.as_str()], |row| Ok(baby_from_row(row)))?;
        let mut babies = Vec::new();
        for row in rows {
            babies.push(row??);
        }
        Ok(babies)
    }

    /// Fetches a baby owned by `user`.
    pub fn get_baby(&self, user: &UserId, id: &BabyId) -> Result<Baby, DbError> {
        find_baby(&self.conn, user, Some(id))
    }

    /// Resolves an optional baby id to one of the user's babies.
    ///
    /// Without an id the user's most recently added baby is used.
    pub fn resolve_baby(&self, user: &UserId, id: Option<&BabyId>) -> Result<Baby, DbError> {
        find_baby(&self.conn, user, id)
    }

    /// Deletes a baby and everything logged for it.
    pub fn delete_baby(&mut self, user: &UserId, id: &BabyId) -> Result<(), DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM babies WHERE id = ? AND user_id = ?",
            [id.as_str(), user.as_str()],
        )?;
        if deleted == 0 {
            return Err(DbError::not_found("baby", id.as_str()));
        }
        info!(baby = %id, "deleted baby");
        Ok(())
    }
}

/// Loads a baby owned by `user`, or their newest baby when `id` is `None`.
///
/// Takes a plain connection so it can run inside an open transaction.
pub(crate) fn find_baby(
    conn: &Connection,
    user: &UserId,
    id: Option<&BabyId>,
) -> Result<Baby, DbError> {
    let found = match id {
        Some(id) => conn
            .query_row(
                &format!("SELECT {BABY_COLUMNS} FROM babies WHERE id = ? AND user_id = ?"),
                [id.as_str(), user.as_str()],
                |row| Ok(baby_from_row(row)),
            )
            .optional()?,
        None => conn
            .query_row(
                &format!(
                    "SELECT {BABY_COLUMNS} FROM babies WHERE user_id = ? \
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                [user.as_str()],
                |row| Ok(baby_from_row(row)),
            )
            .optional()?,
    };

    match found {
        Some(baby) => {
            let baby = baby?;
            debug!(baby = %baby.id, "resolved baby");
            Ok(baby)
        }
        None => Err(DbError::not_found(
            "baby",
            id.map_or("(no babies registered)", BabyId::as_str),
        )),
    }
}

fn baby_from_row(row: &Row<'_>) -> Result<Baby, DbError> {
    let id: String = row.get("id")?;
    let birth_date: String = row.get("birth_date")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Baby {
        birth_date: parse_date(&birth_date, &id)?,
        created_at: parse_timestamp(&created_at, &id)?,
        updated_at: parse_timestamp(&updated_at, &id)?,
        user_id: UserId::new(row.get::<_, String>("user_id")?)?,
        name: row.get("name")?,
        birth_weight_kg: row.get("birth_weight_kg")?,
        birth_height_cm: row.get("birth_height_cm")?,
        sleep_tracking: row.get("sleep_tracking")?,
        id: BabyId::new(id)?,
    })
}
