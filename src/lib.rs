//! Race outcome prediction and pit-stop strategy optimization.
//!
//! The predictor turns driver, team, track and situational attributes into a
//! 30-element feature vector per competitor, trains gradient-boosted
//! regressors on synthetic race results and ranks a field by predicted
//! position and win/podium/points likelihood. The strategy optimizer searches
//! one- and two-stop plans over the dry compounds and compares the best one
//! with the stints a driver actually ran, when lap data is available.
//!
//! Every stochastic function takes the caller's RNG, so a seeded `StdRng`
//! reproduces any result exactly.

pub mod analysis;
pub mod attributes;
pub mod config;
pub mod context;
pub mod data;
pub mod degradation;
pub mod error;
pub mod features;
pub mod history;
pub mod model;
pub mod noise;
pub mod predictor;
pub mod strategy;
pub mod synthetic;

pub use analysis::{DriverAnalysis, DriverAnalyzer, DriverComparison};
pub use attributes::{AttributeTables, Compound, RaceInfo};
pub use config::AppConfig;
pub use data::{CsvLapSource, InMemoryLapSource, LapDataSource, LapRecord, NoLapData, RosterSource, StaticRoster};
pub use error::{ConfigError, DataError, PredictorError, StrategyError};
pub use predictor::{ModelStore, PredictionSource, RacePrediction, RacePredictor};
pub use strategy::{ActualStrategy, StrategyCandidate, StrategyOptimizer, StrategyReport, StrategySource};
