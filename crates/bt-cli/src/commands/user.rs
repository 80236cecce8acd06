//! User registration commands.

use std::io::Write;

use anyhow::Result;
use clap::Subcommand;

use super::util::open_database;
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum UserAction {
    /// Register a user.
    Add {
        /// Unique username.
        username: String,
    },
    /// Remove a user together with their babies and activities.
    Remove {
        username: String,
    },
}

pub fn run<W: Write>(writer: &mut W, action: &UserAction, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    match action {
        UserAction::Add { username } => {
            let user = db.create_user(username)?;
            writeln!(writer, "Added user {} ({})", user.username, user.id)?;
            if config.user.is_none() {
                writeln!(
                    writer,
                    "Hint: set BT_USER={} or add `user = \"{}\"` to the config file.",
                    user.username, user.username
                )?;
            }
        }
        UserAction::Remove { username } => {
            db.delete_user(username)?;
            writeln!(writer, "Removed user {username}")?;
        }
    }
    Ok(())
}
