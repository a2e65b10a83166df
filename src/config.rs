use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::exif::TimezoneOffset;
use crate::patcher::TimeShift;

/// Top-level configuration for exif-timeshift.
///
/// Holds the default shift applied when none is given on the command line,
/// and output behavior (dry run, backups, directory recursion).
///
/// # Loading
///
/// ```rust,no_run
/// use exif_timeshift::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.shift.hours = -1;
/// config.output.recursive = true;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default time shift.
    pub shift: ShiftConfig,
    /// Output behavior (dry run, backups, recursion).
    pub output: OutputConfig,
}

/// Default time shift, used when a flag is not given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftConfig {
    pub hours: i64,
    pub minutes: i64,
    /// UTC offset in whole hours to record, e.g. `10` or `-5`.
    pub timezone_offset: Option<i32>,
}

impl ShiftConfig {
    /// The configured timezone, validated.
    pub fn timezone(&self) -> Result<Option<TimezoneOffset>> {
        self.timezone_offset
            .map(|hours| {
                TimezoneOffset::from_hours(hours).with_context(|| {
                    format!("Configured timezone_offset {hours} is not a valid UTC offset")
                })
            })
            .transpose()
    }

    pub fn to_shift(&self) -> Result<TimeShift> {
        TimeShift::new(self.hours, self.minutes, self.timezone()?)
    }
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, report what would change without modifying any files.
    pub dry_run: bool,
    /// If `true`, create a `.bak` copy before modifying an image.
    pub backup_originals: bool,
    /// If `true`, also process JPEGs in subdirectories.
    pub recursive: bool,
}

impl Config {
    /// Resolve the config file path: config.json next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::debug!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
