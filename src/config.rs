//! Run parameters, read from YAML. Every field has a default, so a partial file (or no
//! file at all) is fine.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::data::candidate::CategoryCounts;
use crate::optimizer::sampling::SamplingConfig;
use crate::optimizer::star::StarEligibility;
use crate::parallel::WorkerPool;

pub const DEFAULT_CONFIG_PATH: &str = "gridpick.yaml";
pub const CONFIG_PATH_ENV: &str = "GRIDPICK_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub budget: f64,
    pub driver_quota: u32,
    pub team_quota: u32,
    /// Drivers strictly cheaper than this may be starred.
    pub star_cost_threshold: f64,
    pub trial_count: usize,
    pub inclusion_threshold: f64,
    pub max_retries: usize,
    /// Base seed for sampling. Drawn from OS entropy when absent.
    pub seed: Option<u64>,
    /// Worker threads; 0 uses every core.
    pub workers: usize,
    pub output_dir: PathBuf,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            budget: 100.0,
            driver_quota: 5,
            team_quota: 1,
            star_cost_threshold: 15.0,
            trial_count: 10_000,
            inclusion_threshold: 700.0,
            max_retries: 100,
            seed: None,
            workers: 0,
            output_dir: PathBuf::from("results"),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read config file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config YAML: {err}"),
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl RosterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "budget must be a non-negative number, got {}",
                self.budget
            )));
        }
        if !self.star_cost_threshold.is_finite() || self.star_cost_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "star_cost_threshold must be a non-negative number, got {}",
                self.star_cost_threshold
            )));
        }
        if self.inclusion_threshold.is_nan() {
            return Err(ConfigError::Invalid("inclusion_threshold is NaN".to_string()));
        }
        if self.trial_count == 0 {
            return Err(ConfigError::Invalid("trial_count must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn targets(&self) -> CategoryCounts {
        CategoryCounts::new(i64::from(self.driver_quota), i64::from(self.team_quota))
    }

    pub fn eligibility(&self) -> StarEligibility {
        StarEligibility::new(self.star_cost_threshold)
    }

    pub fn worker_pool(&self) -> WorkerPool {
        WorkerPool::with_workers(self.workers)
    }

    pub fn sampling(&self, seed: u64) -> SamplingConfig {
        SamplingConfig {
            trial_count: self.trial_count,
            inclusion_threshold: self.inclusion_threshold,
            max_retries: self.max_retries,
            seed,
        }
    }

    /// The configured seed, or a fresh one from OS entropy (clock-derived if that fails).
    pub fn resolve_seed(&self) -> u64 {
        if let Some(seed) = self.seed {
            return seed;
        }
        let mut bytes = [0u8; 8];
        match getrandom::getrandom(&mut bytes) {
            Ok(()) => u64::from_le_bytes(bytes),
            Err(err) => {
                warn!("OS entropy unavailable ({err}); seeding from the clock");
                Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64
            }
        }
    }
}

/// Load and validate a config file. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<RosterConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(RosterConfig::default());
    }
    let raw = fs::read_to_string(path).map_err(ConfigError::Read)?;
    let config: RosterConfig = if raw.trim().is_empty() {
        RosterConfig::default()
    } else {
        serde_yaml::from_str(&raw).map_err(ConfigError::Parse)?
    };
    config.validate()?;
    Ok(config)
}

/// Config path from `GRIDPICK_CONFIG`, else `gridpick.yaml` in the working directory.
pub fn config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
