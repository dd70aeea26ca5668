//! Run configuration files.
//!
//! A run file names its bar source and carries a full `StrategyConfig`.
//! Every strategy field is optional and falls back to the research defaults:
//!
//! ```toml
//! name = "btc-1m"
//!
//! [data]
//! type = "CSV"
//! path = "data/BTCUSDT_1m.csv"
//!
//! [strategy]
//! cooldown_bars = 10
//!
//! [strategy.detector]
//! jump_band = 3.0
//! threshold = { type = "STATIC", z_band = 2.5 }
//!
//! [strategy.barrier.trailing]
//! arm_threshold_r = 3.0
//! floor_r = 2.5
//! gap_r = 1.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shockflip_core::{CoreError, StrategyConfig};
use thiserror::Error;

use crate::event_study::EventStudyConfig;
use crate::synthetic::SyntheticSpec;

/// Errors from loading or validating a run file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] CoreError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where a run's bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    /// Bar CSV on disk.
    Csv { path: PathBuf },
    /// Seeded synthetic bars.
    Synthetic(SyntheticSpec),
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Synthetic(SyntheticSpec::default())
    }
}

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub data: DataSource,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub event_study: EventStudyConfig,
}

fn default_name() -> String {
    "shockflip".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data: DataSource::default(),
            strategy: StrategyConfig::default(),
            event_study: EventStudyConfig::default(),
        }
    }
}

impl RunConfig {
    /// Parse and validate a TOML run file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        // relative bar paths resolve against the config file's directory
        if let DataSource::Csv { path: bars } = &mut config.data {
            if bars.is_relative() {
                if let Some(dir) = path.parent() {
                    *bars = dir.join(&*bars);
                }
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the strategy, the event study and, for synthetic runs, the
    /// generator spec.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        self.event_study.validate()?;
        if let DataSource::Synthetic(spec) = &self.data {
            spec.validate()?;
        }
        Ok(())
    }

    /// Deterministic hash of the whole run file (data source + strategy).
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
