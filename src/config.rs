use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{DEFAULT_COURSE_COLOR, DEFAULT_SEMESTER};

/// Longest upcoming window the dashboard accepts, in days.
pub const MAX_TIMELINE_DAYS: u32 = 366;

/// Settings shared by the CLI and the dashboard.
///
/// Resolution order, highest first:
/// 1. `--data-dir` on the command line
/// 2. `RPS_DATA_DIR` for the data directory
/// 3. the TOML file at `RPS_CONFIG`, or `<config dir>/rps/config.toml`
/// 4. built-in defaults
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding `rps.json`.
    pub data_dir: PathBuf,
    /// Color given to courses created without one.
    pub default_color: String,
    /// Semester label given to courses created without one.
    pub default_semester: String,
    /// Length of the dashboard's upcoming window, in days (1 to 366).
    pub timeline_days: u32,
    /// Upper bound for the displayed pain score.
    pub display_cap: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            default_color: DEFAULT_COURSE_COLOR.into(),
            default_semester: DEFAULT_SEMESTER.into(),
            timeline_days: 21,
            display_cap: 100,
        }
    }
}

/// `~/.local/share/rps` on Linux, falling back to the working directory.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("rps"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default location of the config file.
pub fn config_path() -> PathBuf {
    std::env::var("RPS_CONFIG").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rps")
            .join("config.toml")
    })
}

impl Config {
    /// Loads the config file if present and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::from_file(&config_path())?;
        if let Ok(dir) = std::env::var("RPS_DATA_DIR") {
            if !dir.trim().is_empty() {
                cfg.data_dir = PathBuf::from(dir);
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let cfg: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TIMELINE_DAYS).contains(&self.timeline_days) {
            return Err(ConfigError::InvalidValue {
                key: "timeline_days",
                message: format!("must be between 1 and {}", MAX_TIMELINE_DAYS),
            });
        }
        if self.display_cap == 0 {
            return Err(ConfigError::InvalidValue {
                key: "display_cap",
                message: "must be greater than 0".into(),
            });
        }
        if self.default_color.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "default_color",
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}
