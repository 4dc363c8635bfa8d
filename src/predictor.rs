//! Race Outcome Predictor
//!
//! Holds the trained outcome models behind a [`ModelStore`] and turns a round
//! plus a set of competitors into a ranked prediction. The store trains lazily
//! on first use; concurrent first callers wait on a build lock so the models
//! are fitted exactly once, and later readers only take a shared read lock.
//!
//! Runtime failures (empty roster, shape mismatch, bad model output) degrade
//! to a fixed ranking labeled as a fallback. A training shortfall is returned
//! to the caller.

use ndarray::Array2;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::attributes::{AttributeTables, RaceInfo};
use crate::config::{PredictionConfig, TrainingConfig};
use crate::context::DynamicContext;
use crate::data::RosterSource;
use crate::error::PredictorError;
use crate::features::FeatureBuilder;
use crate::model::{BoostingParams, ModelOutput, OutcomeModels};
use crate::noise::clip;
use crate::synthetic::SyntheticGenerator;

/// Season the synthetic races are labeled with.
pub const TRAINING_YEAR: i32 = 2025;

/// Fixed ranking used when the models cannot produce a prediction:
/// (driver, win, podium, points)
const FALLBACK_RANKING: [(&str, f64, f64, f64); 10] = [
    ("VER", 0.35, 0.75, 0.85),
    ("LEC", 0.25, 0.65, 0.80),
    ("HAM", 0.20, 0.55, 0.75),
    ("RUS", 0.15, 0.45, 0.70),
    ("NOR", 0.12, 0.40, 0.65),
    ("PIA", 0.10, 0.35, 0.60),
    ("SAI", 0.08, 0.30, 0.55),
    ("ALO", 0.07, 0.25, 0.50),
    ("PER", 0.05, 0.20, 0.45),
    ("STR", 0.02, 0.10, 0.25),
];

/// Lazily trained, explicitly retrainable outcome models.
pub struct ModelStore {
    tables: Arc<AttributeTables>,
    config: TrainingConfig,
    training_roster: Vec<String>,
    models: RwLock<Option<Arc<OutcomeModels>>>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl ModelStore {
    /// Store that trains on the roster of `tables`.
    pub fn new(tables: Arc<AttributeTables>, config: TrainingConfig) -> Self {
        let training_roster = tables.roster().to_vec();
        Self {
            tables,
            config,
            training_roster,
            models: RwLock::new(None),
            build_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn with_training_roster(mut self, roster: Vec<String>) -> Self {
        self.training_roster = roster;
        self
    }

    pub fn is_trained(&self) -> bool {
        self.models.read().is_some()
    }

    /// Number of completed training runs.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Fits fresh models and replaces whatever was there.
    pub fn train(&self) -> Result<Arc<OutcomeModels>, PredictorError> {
        let _guard = self.build_lock.lock();
        self.build()
    }

    /// Current models, training them first if the store is empty.
    pub fn models(&self) -> Result<Arc<OutcomeModels>, PredictorError> {
        if let Some(models) = self.models.read().as_ref() {
            return Ok(Arc::clone(models));
        }
        let _guard = self.build_lock.lock();
        // another caller may have finished the build while we waited
        if let Some(models) = self.models.read().as_ref() {
            return Ok(Arc::clone(models));
        }
        self.build()
    }

    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<ModelOutput>, PredictorError> {
        self.models()?.predict(features)
    }

    // caller holds build_lock
    fn build(&self) -> Result<Arc<OutcomeModels>, PredictorError> {
        info!(
            "training outcome models on {} synthetic races (seed {})",
            self.config.races, self.config.seed
        );
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let set = SyntheticGenerator::new(&self.tables, &self.config).generate(
            TRAINING_YEAR,
            &self.training_roster,
            &mut rng,
        )?;
        let models = Arc::new(OutcomeModels::fit(&set, &BoostingParams::from(&self.config))?);
        *self.models.write() = Some(Arc::clone(&models));
        self.builds.fetch_add(1, Ordering::SeqCst);
        info!("outcome models trained on {} samples", models.samples());
        Ok(models)
    }
}

/// Model output for one competitor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverPrediction {
    pub driver: String,
    pub team: Option<String>,
    pub predicted_position: f64,
    pub win_probability: f64,
    pub podium_probability: f64,
    pub points_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDriver {
    pub driver: String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinnerPrediction {
    pub driver: String,
    pub probability: f64,
    /// the winner's own predicted position; may not be the lowest in the field
    pub predicted_position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PredictionSource {
    Model { samples: usize },
    Fallback { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RacePrediction {
    pub race_info: RaceInfo,
    pub winner: WinnerPrediction,
    pub podium: Vec<RankedDriver>,
    pub points: Vec<RankedDriver>,
    /// sorted by predicted position
    pub full_predictions: Vec<DriverPrediction>,
    pub dynamic_factors: Option<DynamicContext>,
    pub confidence: f64,
    pub source: PredictionSource,
}

impl RacePrediction {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, PredictionSource::Fallback { .. })
    }
}

/// clip(1 - 4 * population variance of the win probabilities)
pub fn confidence(win_probabilities: &[f64]) -> f64 {
    if win_probabilities.is_empty() {
        return 0.0;
    }
    let n = win_probabilities.len() as f64;
    let mean = win_probabilities.iter().sum::<f64>() / n;
    let var = win_probabilities.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    clip(1.0 - 4.0 * var, 0.0, 1.0)
}

/// Top `len` drivers by `key`, highest first; ties keep input order.
fn top_by<F>(predictions: &[DriverPrediction], len: usize, key: F) -> Vec<RankedDriver>
where
    F: Fn(&DriverPrediction) -> f64,
{
    let mut order: Vec<&DriverPrediction> = predictions.iter().collect();
    order.sort_by(|a, b| key(b).total_cmp(&key(a)));
    order
        .into_iter()
        .take(len)
        .map(|p| RankedDriver {
            driver: p.driver.clone(),
            probability: key(p),
        })
        .collect()
}

pub struct RacePredictor {
    tables: Arc<AttributeTables>,
    store: Arc<ModelStore>,
    roster: Box<dyn RosterSource>,
    config: PredictionConfig,
}

impl RacePredictor {
    pub fn new(
        tables: Arc<AttributeTables>,
        store: Arc<ModelStore>,
        roster: Box<dyn RosterSource>,
        config: PredictionConfig,
    ) -> Self {
        Self {
            tables,
            store,
            roster,
            config,
        }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Prediction for every active competitor of the season.
    pub fn predict_outcome<R: Rng + ?Sized>(
        &self,
        year: i32,
        round: u32,
        rng: &mut R,
    ) -> Result<RacePrediction, PredictorError> {
        let drivers = self.roster.active_competitors(year);
        self.predict_for(year, round, &drivers, rng)
    }

    /// Prediction for an arbitrary set of competitors.
    pub fn predict_for<R: Rng + ?Sized>(
        &self,
        year: i32,
        round: u32,
        drivers: &[String],
        rng: &mut R,
    ) -> Result<RacePrediction, PredictorError> {
        match self.try_predict(year, round, drivers, rng) {
            Ok(prediction) => Ok(prediction),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("prediction for {} round {} failed, using fallback: {}", year, round, e);
                Ok(self.fallback(year, round, e.to_string()))
            }
        }
    }

    fn try_predict<R: Rng + ?Sized>(
        &self,
        year: i32,
        round: u32,
        drivers: &[String],
        rng: &mut R,
    ) -> Result<RacePrediction, PredictorError> {
        if drivers.is_empty() {
            return Err(PredictorError::EmptyRoster);
        }
        let models = self.store.models()?;
        let race = FeatureBuilder::new(&self.tables).build_race_features(drivers, year, round, rng);
        let outputs = models.predict(&race.matrix)?;
        debug!("scored {} competitors for round {}", outputs.len(), round);

        let predictions: Vec<DriverPrediction> = drivers
            .iter()
            .zip(outputs)
            .map(|(code, out)| DriverPrediction {
                driver: code.clone(),
                team: self.tables.team_of(code).map(str::to_string),
                predicted_position: out.position,
                win_probability: out.win,
                podium_probability: out.podium,
                points_probability: out.points,
            })
            .collect();

        Ok(self.assemble(
            year,
            round,
            predictions,
            Some(race.context),
            PredictionSource::Model {
                samples: models.samples(),
            },
        ))
    }

    fn assemble(
        &self,
        year: i32,
        round: u32,
        mut predictions: Vec<DriverPrediction>,
        dynamic_factors: Option<DynamicContext>,
        source: PredictionSource,
    ) -> RacePrediction {
        let win: Vec<f64> = predictions.iter().map(|p| p.win_probability).collect();

        // ties keep the earlier driver
        let winner = predictions
            .iter()
            .fold(None, |best: Option<&DriverPrediction>, p| match best {
                Some(b) if b.win_probability >= p.win_probability => Some(b),
                _ => Some(p),
            })
            .map(|p| WinnerPrediction {
                driver: p.driver.clone(),
                probability: p.win_probability,
                predicted_position: p.predicted_position,
            })
            .unwrap_or(WinnerPrediction {
                driver: String::new(),
                probability: 0.0,
                predicted_position: 0.0,
            });

        let podium = top_by(&predictions, self.config.podium_list_len, |p| p.podium_probability);
        let points = top_by(&predictions, self.config.points_list_len, |p| p.points_probability);
        predictions.sort_by(|a, b| a.predicted_position.total_cmp(&b.predicted_position));

        RacePrediction {
            race_info: self.tables.race_info(year, round),
            winner,
            podium,
            points,
            full_predictions: predictions,
            dynamic_factors,
            confidence: confidence(&win),
            source,
        }
    }

    /// Fixed ranking, independent of the models.
    pub fn fallback(&self, year: i32, round: u32, reason: String) -> RacePrediction {
        let predictions = FALLBACK_RANKING
            .iter()
            .enumerate()
            .map(|(i, (code, win, podium, points))| DriverPrediction {
                driver: code.to_string(),
                team: self.tables.team_of(code).map(str::to_string),
                predicted_position: (i + 1) as f64,
                win_probability: *win,
                podium_probability: *podium,
                points_probability: *points,
            })
            .collect();
        self.assemble(year, round, predictions, None, PredictionSource::Fallback { reason })
    }
}
