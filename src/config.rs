use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Minimum number of synthetic rows the trainer accepts.
pub const MIN_TRAINING_SAMPLES: usize = 100;

/// Synthetic data generation and model fitting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Races sampled in the primary pass
    pub races: usize,
    /// Races sampled in the reduced-cardinality pass
    pub fallback_races: usize,
    /// Rows required before fitting; values below 100 are raised to 100
    pub min_samples: usize,
    /// Seed for the synthetic generator
    pub seed: u64,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub min_samples_leaf: usize,
    pub n_bins: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            races: 1000,
            fallback_races: 200,
            min_samples: MIN_TRAINING_SAMPLES,
            seed: 42,
            n_estimators: 50,
            max_depth: 3,
            learning_rate: 0.1,
            min_samples_leaf: 5,
            n_bins: 16,
        }
    }
}

impl TrainingConfig {
    pub fn required_samples(&self) -> usize {
        self.min_samples.max(MIN_TRAINING_SAMPLES)
    }
}

/// Pit-stop search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Seconds lost per stop
    pub pit_loss: f64,
    /// +/- laps of jitter on the single stop
    pub one_stop_jitter: i32,
    /// +/- laps of jitter on each of the two stops
    pub two_stop_jitter: i32,
    /// Largest |actual - optimal| reported as a saving
    pub max_time_savings: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            pit_loss: 25.0,
            one_stop_jitter: 5,
            two_stop_jitter: 3,
            max_time_savings: 30.0,
        }
    }
}

/// Output shaping for race predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub podium_list_len: usize,
    pub points_list_len: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            podium_list_len: 8,
            points_list_len: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub training: TrainingConfig,
    pub strategy: StrategyConfig,
    pub prediction: PredictionConfig,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
