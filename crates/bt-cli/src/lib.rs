//! Baby tracker CLI library.
//!
//! This crate provides the CLI interface for the baby tracker.

mod cli;
pub mod commands;
mod config;

use bt_core::ValidationError;
use bt_db::{DbError, ErrorKind};

pub use cli::{Cli, Commands};
pub use config::Config;

/// Finds the store or validation error behind a command failure.
///
/// Returns `None` for failures that did not come from the domain layer, such
/// as a missing configuration or an unparseable relative time.
pub fn classify(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain().find_map(|cause| {
        cause.downcast_ref::<DbError>().map(DbError::kind).or_else(|| {
            cause
                .downcast_ref::<ValidationError>()
                .map(|_| ErrorKind::Validation)
        })
    })
}

/// Process exit code for a failure of the given kind.
pub const fn exit_code(kind: Option<ErrorKind>) -> u8 {
    match kind {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Conflict) => 4,
        Some(ErrorKind::Internal) | None => 1,
    }
}
