//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use vt_core::{Cadence, ContainerId};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the snapshot document.
    pub snapshot_path: PathBuf,

    /// Path to the roster file.
    pub roster_path: PathBuf,

    /// Name of the idle (AFK) container; time there never counts as voice
    /// presence. Empty disables idle handling.
    pub idle_container: String,

    /// Daily checkpoint-and-save time, `HH:MM` UTC.
    pub checkpoint_at: String,

    /// Rollover weekday (e.g. `mon`).
    pub rollover_weekday: String,

    /// Rollover time on that weekday, `HH:MM` UTC.
    pub rollover_at: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("snapshot_path", &self.snapshot_path)
            .field("roster_path", &self.roster_path)
            .field("idle_container", &self.idle_container)
            .field("checkpoint_at", &self.checkpoint_at)
            .field("rollover_weekday", &self.rollover_weekday)
            .field("rollover_at", &self.rollover_at)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            snapshot_path: data_dir.join("snapshot.json"),
            roster_path: data_dir.join("roster.json"),
            idle_container: "AFK".to_string(),
            checkpoint_at: "04:00".to_string(),
            rollover_weekday: "mon".to_string(),
            rollover_at: "00:00".to_string(),
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

        // Load from environment variables (VT_*)
        figment = figment.merge(Env::prefixed("VT_"));

        figment.extract()
    }

    /// The idle container, if one is configured.
    pub fn idle_container_id(&self) -> Option<ContainerId> {
        if self.idle_container.is_empty() {
            None
        } else {
            ContainerId::new(self.idle_container.clone()).ok()
        }
    }

    /// The daily checkpoint cadence.
    pub fn checkpoint_cadence(&self) -> Result<Cadence> {
        Ok(Cadence::Daily {
            at: parse_time(&self.checkpoint_at)
                .with_context(|| format!("invalid checkpoint_at: {}", self.checkpoint_at))?,
        })
    }

    /// The weekly rollover cadence.
    pub fn rollover_cadence(&self) -> Result<Cadence> {
        let weekday: Weekday = self
            .rollover_weekday
            .parse()
            .ok()
            .with_context(|| format!("invalid rollover_weekday: {}", self.rollover_weekday))?;
        Ok(Cadence::Weekly {
            weekday,
            at: parse_time(&self.rollover_at)
                .with_context(|| format!("invalid rollover_at: {}", self.rollover_at))?,
        })
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M").ok()
}

/// Returns the platform-specific config directory for vt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("vt"))
}

/// Returns the platform-specific data directory for vt.
///
/// On Linux: `~/.local/share/vt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("vt"))
}
