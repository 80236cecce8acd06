//! Baby profile commands.

use std::io::Write;

use anyhow::{Context, Result};
use bt_core::{Baby, BabyId, NewBaby, parse_date};
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};

use super::util::{acting_user, open_database, write_json};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum BabyAction {
    /// Register a baby.
    Add(AddArgs),
    /// List your babies, most recently added first.
    List(ListArgs),
    /// Remove a baby and everything logged for it.
    Remove(RemoveArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub name: String,
    /// Birth date (YYYY-MM-DD).
    #[arg(long)]
    pub birth_date: String,
    #[arg(long)]
    pub birth_weight_kg: Option<f64>,
    #[arg(long)]
    pub birth_height_cm: Option<f64>,
    /// Do not show sleep tracking for this baby.
    #[arg(long)]
    pub no_sleep_tracking: bool,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    pub id: String,
}

pub fn run<W: Write>(writer: &mut W, action: &BabyAction, config: &Config) -> Result<()> {
    match action {
        BabyAction::Add(args) => {
            let mut db = open_database(config)?;
            let user = acting_user(&db, config)?;
            let baby = NewBaby {
                name: args.name.clone(),
                birth_date: parse_date(&args.birth_date)?,
                birth_weight_kg: args.birth_weight_kg,
                birth_height_cm: args.birth_height_cm,
                sleep_tracking: !args.no_sleep_tracking,
            };
            let created = db
                .create_baby(&user, &baby)
                .context("failed to add baby")?;
            if args.json {
                return write_json(writer, &created);
            }
            writeln!(writer, "Added {} ({})", created.name, created.id)?;
        }
        BabyAction::List(args) => {
            let db = open_database(config)?;
            let user = acting_user(&db, config)?;
            let babies = db.list_babies(&user)?;
            if args.json {
                return write_json(writer, &babies);
            }
            write_babies(writer, &babies, Utc::now().date_naive())?;
        }
        BabyAction::Remove(args) => {
            let mut db = open_database(config)?;
            let user = acting_user(&db, config)?;
            db.delete_baby(&user, &BabyId::new(args.id.as_str())?)?;
            writeln!(writer, "Removed baby {}", args.id)?;
        }
    }
    Ok(())
}

fn write_babies<W: Write>(writer: &mut W, babies: &[Baby], today: NaiveDate) -> Result<()> {
    if babies.is_empty() {
        writeln!(writer, "No babies registered. Add one with 'bt baby add'.")?;
        return Ok(());
    }
    for baby in babies {
        writeln!(
            writer,
            "{}  {}  born {}  {}",
            baby.id,
            baby.name,
            baby.birth_date,
            baby.format_age(today)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bt_db::{DbError, ErrorKind};
    use insta::assert_snapshot;

    use super::*;
    use crate::commands::util::test_support::config_with_baby;

    #[test]
    fn list_shows_age() {
        let temp = tempfile::tempdir().unwrap();
        let (config, baby) = config_with_baby(temp.path());
        let db = open_database(&config).unwrap();
        let user = acting_user(&db, &config).unwrap();
        let babies = db.list_babies(&user).unwrap();

        let mut output = Vec::new();
        let today = NaiveDate::from_ymd_opt(2025, 1, 22).unwrap();
        write_babies(&mut output, &babies, today).unwrap();
        let output = String::from_utf8(output)
            .unwrap()
            .replace(baby.id.as_str(), "[ID]");
        assert_snapshot!(output, @"[ID]  Ada  born 2025-01-01  3 weeks old");
    }

    #[test]
    fn add_rejects_bad_birth_date() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());
        let mut output = Vec::new();
        let action = BabyAction::Add(AddArgs {
            name: "Bo".to_string(),
            birth_date: "yesterday".to_string(),
            birth_weight_kg: None,
            birth_height_cm: None,
            no_sleep_tracking: false,
            json: false,
        });
        let err = run(&mut output, &action, &config).unwrap_err();
        assert!(err.downcast_ref::<bt_core::ValidationError>().is_some());
    }

    #[test]
    fn add_then_remove() {
        let temp = tempfile::tempdir().unwrap();
        let (config, _) = config_with_baby(temp.path());
        let mut output = Vec::new();
        let action = BabyAction::Add(AddArgs {
            name: "Bo".to_string(),
            birth_date: "2025-06-01".to_string(),
            birth_weight_kg: Some(3.4),
            birth_height_cm: None,
            no_sleep_tracking: true,
            json: true,
        });
        run(&mut output, &action, &config).unwrap();
        let created: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(created["sleep_tracking"], false);
        let id = created["id"].as_str().unwrap().to_string();

        let remove = BabyAction::Remove(RemoveArgs { id });
        run(&mut Vec::new(), &remove, &config).unwrap();
        let err = run(&mut Vec::new(), &remove, &config).unwrap_err();
        let kind = err.downcast_ref::<DbError>().map(DbError::kind);
        assert_eq!(kind, Some(ErrorKind::NotFound));
    }
}
