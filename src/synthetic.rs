//! Synthetic Training Data
//!
//! Generates labeled race outcomes from ratings alone when real results are
//! unavailable. Each sampled race draws a round and a field of drivers, builds
//! their feature vectors, scores them with a simple performance heuristic and
//! turns the resulting order into position and probability labels.

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::attributes::{AttributeTables, SEASON_LENGTH};
use crate::config::TrainingConfig;
use crate::error::PredictorError;
use crate::features::{block_mean, FeatureBuilder, COMPETITOR_BLOCK, FEATURE_COUNT, TRACK_BLOCK};
use crate::noise::{clip, gaussian};

const SCORE_NOISE: f64 = 0.15;
const LABEL_NOISE: f64 = 0.05;
/// Share of primary races that use a full 15-20 car field.
const FULL_FIELD_SHARE: f64 = 0.9;

/// Probability labels fall off linearly with finishing position.
const WIN_SLOPE: f64 = 0.25;
const PODIUM_SLOPE: f64 = 0.15;
const POINTS_SLOPE: f64 = 0.08;

/// Feature matrix with the four regression targets
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub features: Array2<f64>,
    pub position: Array1<f64>,
    pub win: Array1<f64>,
    pub podium: Array1<f64>,
    pub points: Array1<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct Rows {
    features: Vec<f64>,
    position: Vec<f64>,
    win: Vec<f64>,
    podium: Vec<f64>,
    points: Vec<f64>,
}

impl Rows {
    fn len(&self) -> usize {
        self.position.len()
    }
}

/// Heuristic strength of one row: competitor block times track block, plus noise.
pub fn performance_score<R: Rng + ?Sized>(row: &[f64], rng: &mut R) -> f64 {
    block_mean(row, COMPETITOR_BLOCK) * block_mean(row, TRACK_BLOCK) + gaussian(rng, SCORE_NOISE)
}

/// Linear label clipped to [0, 1].
fn position_label<R: Rng + ?Sized>(position: usize, slope: f64, rng: &mut R) -> f64 {
    clip(
        1.0 - slope * (position as f64 - 1.0) + gaussian(rng, LABEL_NOISE),
        0.0,
        1.0,
    )
}

pub struct SyntheticGenerator<'a> {
    tables: &'a AttributeTables,
    config: &'a TrainingConfig,
}

impl<'a> SyntheticGenerator<'a> {
    pub fn new(tables: &'a AttributeTables, config: &'a TrainingConfig) -> Self {
        Self { tables, config }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        year: i32,
        roster: &[String],
        rng: &mut R,
    ) -> Result<TrainingSet, PredictorError> {
        let required = self.config.required_samples();
        let mut rows = Rows::default();
        let mut failed = 0usize;

        for _ in 0..self.config.races {
            let round = rng.gen_range(1..=SEASON_LENGTH);
            let size = if rng.gen_bool(FULL_FIELD_SHARE) {
                rng.gen_range(15..=20)
            } else {
                rng.gen_range(8..=14)
            };
            if roster.len() < size {
                failed += 1;
                continue;
            }
            let field: Vec<String> = roster.choose_multiple(rng, size).cloned().collect();
            self.push_race(year, &field, round, rng, &mut rows);
        }
        debug!(
            "primary pass: {} samples, {} races skipped",
            rows.len(),
            failed
        );

        if rows.len() < required {
            warn!(
                "primary pass produced {} samples (< {}), running reduced-field pass",
                rows.len(),
                required
            );
            for _ in 0..self.config.fallback_races {
                let round = rng.gen_range(1..=SEASON_LENGTH);
                let size = rng.gen_range(5..=10).min(roster.len());
                if size == 0 {
                    continue;
                }
                let field: Vec<String> = roster.choose_multiple(rng, size).cloned().collect();
                self.push_race(year, &field, round, rng, &mut rows);
            }
        }

        if rows.len() < required {
            return Err(PredictorError::TrainingShortfall {
                produced: rows.len(),
                required,
            });
        }

        info!("generated {} synthetic training samples", rows.len());
        let n = rows.len();
        let features = Array2::from_shape_vec((n, FEATURE_COUNT), rows.features)
            .map_err(|e| PredictorError::Model(e.to_string()))?;

        Ok(TrainingSet {
            features,
            position: Array1::from_vec(rows.position),
            win: Array1::from_vec(rows.win),
            podium: Array1::from_vec(rows.podium),
            points: Array1::from_vec(rows.points),
        })
    }

    fn push_race<R: Rng + ?Sized>(
        &self,
        year: i32,
        field: &[String],
        round: u32,
        rng: &mut R,
        rows: &mut Rows,
    ) {
        let race = FeatureBuilder::new(self.tables).build_race_features(field, year, round, rng);

        let scores: Vec<f64> = race
            .matrix
            .rows()
            .into_iter()
            .map(|row| performance_score(&row.to_vec(), rng))
            .collect();

        // highest score finishes first
        let mut order: Vec<usize> = (0..field.len()).collect();
        order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
        let mut positions = vec![0usize; field.len()];
        for (rank, idx) in order.into_iter().enumerate() {
            positions[idx] = rank + 1;
        }

        for (idx, row) in race.matrix.rows().into_iter().enumerate() {
            let pos = positions[idx];
            rows.features.extend(row.iter());
            rows.position.push(pos as f64);
            rows.win.push(position_label(pos, WIN_SLOPE, rng));
            rows.podium.push(position_label(pos, PODIUM_SLOPE, rng));
            rows.points.push(position_label(pos, POINTS_SLOPE, rng));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            races: 30,
            fallback_races: 20,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_generate_full_roster() {
        let tables = AttributeTables::season_2025();
        let config = small_config();
        let set = SyntheticGenerator::new(&tables, &config)
            .generate(2025, tables.roster(), &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert!(set.len() >= config.required_samples());
        assert_eq!(set.features.ncols(), FEATURE_COUNT);
        assert_eq!(set.position.len(), set.len());
        for label in set.win.iter().chain(set.podium.iter()).chain(set.points.iter()) {
            assert!((0.0..=1.0).contains(label));
        }
        assert!(set.position.iter().all(|p| *p >= 1.0 && *p <= 20.0));
    }

    #[test]
    fn test_small_roster_uses_reduced_pass() {
        let tables = AttributeTables::season_2025();
        let config = TrainingConfig {
            races: 10,
            fallback_races: 40,
            ..TrainingConfig::default()
        };
        // 12 drivers can never fill a 15+ field and only sometimes an 8-14 one
        let roster: Vec<String> = tables.roster()[..12].to_vec();
        let set = SyntheticGenerator::new(&tables, &config)
            .generate(2025, &roster, &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert!(set.len() >= 100);
    }

    #[test]
    fn test_shortfall_is_an_error() {
        let tables = AttributeTables::season_2025();
        let config = TrainingConfig {
            races: 5,
            fallback_races: 20,
            ..TrainingConfig::default()
        };
        let roster: Vec<String> = tables.roster()[..3].to_vec();
        let err = SyntheticGenerator::new(&tables, &config)
            .generate(2025, &roster, &mut StdRng::seed_from_u64(3))
            .unwrap_err();
        match err {
            PredictorError::TrainingShortfall { produced, required } => {
                assert_eq!(produced, 60);
                assert_eq!(required, 100);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_empty_roster_is_shortfall() {
        let tables = AttributeTables::season_2025();
        let config = small_config();
        let err = SyntheticGenerator::new(&tables, &config)
            .generate(2025, &[], &mut StdRng::seed_from_u64(4))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_positions_are_permutation_per_race() {
        let tables = AttributeTables::season_2025();
        let config = TrainingConfig {
            races: 1,
            fallback_races: 0,
            min_samples: 0,
            ..TrainingConfig::default()
        };
        let generator = SyntheticGenerator::new(&tables, &config);
        let mut rows = Rows::default();
        let field: Vec<String> = tables.roster()[..6].to_vec();
        generator.push_race(2025, &field, 4, &mut StdRng::seed_from_u64(5), &mut rows);
        let mut pos = rows.position.clone();
        pos.sort_by(f64::total_cmp);
        assert_eq!(pos, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(rows.features.len(), 6 * FEATURE_COUNT);
    }

    #[test]
    fn test_labels_fall_with_position() {
        let tables = AttributeTables::season_2025();
        let config = small_config();
        let generator = SyntheticGenerator::new(&tables, &config);
        let mut rng = StdRng::seed_from_u64(6);
        let mut rows = Rows::default();
        let field: Vec<String> = tables.roster()[..10].to_vec();
        for round in 0..60 {
            generator.push_race(2025, &field, round % SEASON_LENGTH + 1, &mut rng, &mut rows);
        }

        // mean label per finishing position, 1..=10
        let mean_by_position = |labels: &[f64]| -> Vec<f64> {
            (1..=10)
                .map(|pos| {
                    let hits: Vec<f64> = rows
                        .position
                        .iter()
                        .zip(labels)
                        .filter(|(p, _)| **p == pos as f64)
                        .map(|(_, l)| *l)
                        .collect();
                    hits.iter().sum::<f64>() / hits.len() as f64
                })
                .collect()
        };
        let win = mean_by_position(&rows.win);
        let podium = mean_by_position(&rows.podium);
        let points = mean_by_position(&rows.points);

        for labels in [&win, &podium, &points] {
            assert!(labels[0] > 0.9, "{:?}", labels);
            for w in labels.windows(2) {
                assert!(w[1] <= w[0] + 0.03, "{:?}", labels);
            }
        }
        // a steeper slope sits lower at every position past the leader
        for pos in 1..10 {
            assert!(win[pos] <= podium[pos] + 0.03, "P{}: {} vs {}", pos + 1, win[pos], podium[pos]);
            assert!(podium[pos] <= points[pos] + 0.03, "P{}: {} vs {}", pos + 1, podium[pos], points[pos]);
        }
        assert!(win[1] - win[4] > 0.5);
        assert!(points[0] - points[9] > 0.5);
    }
}
