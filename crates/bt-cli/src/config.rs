//! Configuration loading and management.

use std::path::{Path, PathBuf};

use bt_core::TzOffset;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Username of the acting parent.
    #[serde(default)]
    pub user: Option<String>,

    /// Default browser-style timezone offset in minutes (positive = behind UTC).
    ///
    /// The host's local offset is used when unset.
    #[serde(default)]
    pub tz_offset: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("bt.db"),
            user: None,
            tz_offset: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (BT_*)
        figment = figment.merge(Env::prefixed("BT_"));

        figment.extract()
    }

    /// The timezone offset to use when a command does not pass one.
    pub fn default_tz(&self) -> Result<TzOffset, bt_core::ValidationError> {
        self.tz_offset
            .map_or_else(|| Ok(TzOffset::host()), TzOffset::from_browser_minutes)
    }
}

/// Returns the platform-specific config directory for bt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("bt"))
}

/// Returns the platform-specific data directory for bt.
///
/// On Linux: `~/.local/share/bt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("bt"))
}
