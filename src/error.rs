use std::io;
use thiserror::Error;

/// Errors raised by the lap/stint telemetry sources
#[derive(Debug, Error)]
pub enum DataError {
    #[error("No data available for {driver} in {year} Round {round}")]
    Unavailable { year: i32, round: u32, driver: String },

    #[error("Failed to read lap data: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse lap data: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors raised while training or querying the outcome models
#[derive(Debug, Error)]
pub enum PredictorError {
    /// Synthetic generation could not produce enough rows; training on less is meaningless
    #[error("Synthetic training set too small: produced {produced} samples, need at least {required}")]
    TrainingShortfall { produced: usize, required: usize },

    #[error("No active competitors to predict")]
    EmptyRoster,

    #[error("Feature matrix has {actual} columns, model expects {expected}")]
    Shape { expected: usize, actual: usize },

    #[error("Model error: {0}")]
    Model(String),
}

impl PredictorError {
    /// Only a training shortfall is a structural failure; everything else degrades to a fallback
    pub fn is_fatal(&self) -> bool {
        matches!(self, PredictorError::TrainingShortfall { .. })
    }
}

/// Errors raised by the pit-stop strategy search
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("No feasible strategy for a {laps} lap race")]
    NoFeasibleStrategy { laps: u32 },

    #[error("Unknown compound: {0}")]
    UnknownCompound(String),

    #[error("Plan covers {planned} laps, race has {laps}")]
    PlanLength { laps: u32, planned: u32 },
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
