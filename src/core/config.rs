//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SweepError};

/// Default recovery log file name, relative to the working directory.
pub const DEFAULT_RECOVERY_LOG: &str = "delete_log.json";

/// Full dirsweep configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub sweep: SweepConfig,
    pub paths: PathsConfig,
    pub activity: ActivityConfig,
}

/// Sweep behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SweepConfig {
    /// Directory swept when none is given on the command line or prompt.
    pub default_base_dir: PathBuf,
    /// Report what would be removed without touching the filesystem.
    pub dry_run: bool,
}

/// Filesystem paths used by dirsweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// Recovery log written by a sweep and read by a restore.
    pub recovery_log: PathBuf,
    /// Append-only JSONL audit trail.
    pub activity_log: PathBuf,
}

/// Activity log tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ActivityConfig {
    pub enabled: bool,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            default_base_dir: PathBuf::from("."),
            dry_run: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[DSW-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("dirsweep").join("config.toml"),
            recovery_log: PathBuf::from(DEFAULT_RECOVERY_LOG),
            activity_log: home_dir
                .join(".local")
                .join("share")
                .join("dirsweep")
                .join("activity.jsonl"),
        }
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|e| SweepError::io(&path_buf, e))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(SweepError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("DIRSWEEP_RECOVERY_LOG") {
            self.paths.recovery_log = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("DIRSWEEP_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("DIRSWEEP_ACTIVITY_ENABLED") {
            self.activity.enabled = parse_env_bool("DIRSWEEP_ACTIVITY_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("DIRSWEEP_DRY_RUN") {
            self.sweep.dry_run = parse_env_bool("DIRSWEEP_DRY_RUN", &raw)?;
        }
        if let Some(raw) = lookup("DIRSWEEP_BASE_DIR") {
            self.sweep.default_base_dir = PathBuf::from(raw);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.paths.recovery_log.as_os_str().is_empty() {
            return Err(SweepError::InvalidConfig {
                details: "paths.recovery_log must not be empty".to_string(),
            });
        }
        if self.paths.recovery_log.file_name().is_none() {
            return Err(SweepError::InvalidConfig {
                details: format!(
                    "paths.recovery_log must name a file, got {}",
                    self.paths.recovery_log.display()
                ),
            });
        }
        if self.activity.max_size_bytes == 0 {
            return Err(SweepError::InvalidConfig {
                details: "activity.max_size_bytes must be > 0".to_string(),
            });
        }
        if self.activity.max_rotated_files == 0 {
            return Err(SweepError::InvalidConfig {
                details: "activity.max_rotated_files must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| SweepError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
