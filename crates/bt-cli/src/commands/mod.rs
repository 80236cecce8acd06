//! CLI subcommand implementations.

pub mod activity;
pub mod baby;
pub mod stats;
pub mod timer;
pub mod user;
pub mod util;
