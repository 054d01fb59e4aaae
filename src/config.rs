//! Optional TOML configuration stored next to the site workbooks.
//!
//! Every key has a default, so a missing `config.toml` is equivalent to an
//! empty one:
//!
//! ```toml
//! default_site = "north_tower"
//! max_propagation_steps = 64
//! hours_per_day = 8.0
//! arrival_markers = ["site-lead", "storekeeper"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, Result};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Site opened when `--db` is not given.
    pub default_site: Option<String>,
    /// Upper bound on transitions processed for a single task write.
    pub max_propagation_steps: usize,
    /// Working hours per allocated day, used by the dashboard.
    pub hours_per_day: f64,
    /// Users allowed to mark requisition materials as arrived.
    pub arrival_markers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_site: None,
            max_propagation_steps: 64,
            hours_per_day: 8.0,
            arrival_markers: Vec::new(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the data directory, falling back to defaults if absent.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(&path).map_err(|source| AppError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| AppError::Config {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn may_mark_arrival(&self, user: &str) -> bool {
        self.arrival_markers.iter().any(|u| u == user)
    }
}

/// Resolve the data directory: `$SPM_DIR`, else `~/.spm`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SPM_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".spm")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.max_propagation_steps, 64);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let cfg = Config::from_toml("hours_per_day = 7.5\narrival_markers = [\"amal\"]\n").unwrap();
        assert_eq!(cfg.hours_per_day, 7.5);
        assert_eq!(cfg.max_propagation_steps, 64);
        assert!(cfg.may_mark_arrival("amal"));
        assert!(!cfg.may_mark_arrival("omar"));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }
}
