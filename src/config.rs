use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PriorityError;
use crate::models::{PriorityWeights, WaitConfig};
use crate::priority::ScoreCalculator;

pub const DEFAULT_ACTIVITY_WINDOW_DAYS: i64 = 30;
pub const MAX_ACTIVITY_WINDOW_DAYS: i64 = 3650;

/// Everything the engine reads from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEngineConfig")]
pub struct EngineConfig {
    pub wait: WaitConfig,
    pub weights: PriorityWeights,
    pub activity_window_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wait: WaitConfig::default(),
            weights: PriorityWeights::default(),
            activity_window_days: DEFAULT_ACTIVITY_WINDOW_DAYS,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawEngineConfig {
    wait: WaitConfig,
    weights: PriorityWeights,
    activity_window_days: i64,
}

impl Default for RawEngineConfig {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            wait: config.wait,
            weights: config.weights,
            activity_window_days: config.activity_window_days,
        }
    }
}

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = PriorityError;

    fn try_from(raw: RawEngineConfig) -> Result<Self, Self::Error> {
        validate_activity_window(raw.activity_window_days)?;
        Ok(Self {
            wait: raw.wait,
            weights: raw.weights,
            activity_window_days: raw.activity_window_days,
        })
    }
}

fn validate_activity_window(days: i64) -> Result<(), PriorityError> {
    if !(1..=MAX_ACTIVITY_WINDOW_DAYS).contains(&days) {
        return Err(PriorityError::InvalidConfig(format!(
            "activity_window_days must be between 1 and {MAX_ACTIVITY_WINDOW_DAYS}, got {days}"
        )));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("failed to read config file {}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}", path.display())]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Engine(#[from] PriorityError),
}

impl EngineConfig {
    /// Reads the optional JSON file, then applies `BOOKING_*` environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        Self::from_lookup(base, |key| env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_lookup<F>(base: Self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_wait_days = read_i64(&lookup, "BOOKING_WAIT_DAYS")?
            .unwrap_or(base.wait.base_wait_days());
        let overdue_multiplier = read_f64(&lookup, "BOOKING_OVERDUE_MULTIPLIER")?
            .unwrap_or(base.wait.overdue_multiplier());
        let late_multiplier = read_f64(&lookup, "BOOKING_LATE_MULTIPLIER")?
            .unwrap_or(base.wait.late_multiplier());

        let weights = PriorityWeights {
            recency: read_f64(&lookup, "BOOKING_WEIGHT_RECENCY")?.unwrap_or(base.weights.recency),
            slots: read_f64(&lookup, "BOOKING_WEIGHT_SLOTS")?.unwrap_or(base.weights.slots),
            activity: read_f64(&lookup, "BOOKING_WEIGHT_ACTIVITY")?
                .unwrap_or(base.weights.activity),
            completions: read_f64(&lookup, "BOOKING_WEIGHT_COMPLETIONS")?
                .unwrap_or(base.weights.completions),
        };
        weights.validate()?;

        let activity_window_days = read_i64(&lookup, "BOOKING_ACTIVITY_WINDOW_DAYS")?
            .unwrap_or(base.activity_window_days);
        validate_activity_window(activity_window_days)?;

        Ok(Self {
            wait: WaitConfig::new(base_wait_days, overdue_multiplier, late_multiplier)?,
            weights,
            activity_window_days,
        })
    }

    pub fn calculator(&self) -> Result<ScoreCalculator, PriorityError> {
        ScoreCalculator::new(self.weights)
    }
}

fn read_i64<F>(lookup: &F, key: &'static str) -> Result<Option<i64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(None),
    }
}

fn read_f64<F>(lookup: &F, key: &'static str) -> Result<Option<f64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(None),
    }
}
