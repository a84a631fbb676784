//! Planner configuration.

use budget_econ::{RateTable, RateTableError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(String),
    #[error(transparent)]
    Rates(#[from] RateTableError),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Quiet period before a requested save is written.
    pub save_debounce_ms: u64,
    /// Cadence of the periodic save.
    pub save_interval_secs: u64,
    /// Directory of the JSON document store.
    pub store_dir: PathBuf,
    /// Rate table YAML; the built-in sheet when unset.
    pub rate_table: Option<PathBuf>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 1500,
            save_interval_secs: 30,
            store_dir: PathBuf::from("./saves"),
            rate_table: None,
        }
    }
}

impl PlannerConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    pub fn load_rate_table(&self) -> Result<RateTable, ConfigError> {
        let table = match &self.rate_table {
            Some(path) => RateTable::load(path)?,
            None => RateTable::builtin()?,
        };
        Ok(table)
    }
}
