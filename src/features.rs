//! Feature Engineering
//!
//! Flattens ratings, track character, simulated form and race context into the
//! fixed-order vector the outcome models are trained on.

use ndarray::Array2;
use rand::Rng;

use crate::attributes::AttributeTables;
use crate::context::{self, DynamicContext};
use crate::history;

/// Number of features per competitor.
/// Driver (9) + Team (4) + Track (8) + History (4) + Dynamic (2) + Weather (2) + Synergy (1)
pub const FEATURE_COUNT: usize = 30;

/// Columns of the competitor/team block.
pub const COMPETITOR_BLOCK: std::ops::Range<usize> = 0..13;
/// Columns of the track block.
pub const TRACK_BLOCK: std::ops::Range<usize> = 13..21;

const MAX_PRESSURE: f64 = 1.2;

/// Features for every competitor of one race plus the context they share
#[derive(Debug, Clone)]
pub struct RaceFeatures {
    pub year: i32,
    pub round: u32,
    pub drivers: Vec<String>,
    /// drivers.len() x FEATURE_COUNT
    pub matrix: Array2<f64>,
    pub context: DynamicContext,
}

pub struct FeatureBuilder<'a> {
    tables: &'a AttributeTables,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(tables: &'a AttributeTables) -> Self {
        Self { tables }
    }

    /// Vector for one driver under an already drawn race context.
    pub fn driver_features<R: Rng + ?Sized>(
        &self,
        code: &str,
        round: u32,
        ctx: &DynamicContext,
        rng: &mut R,
    ) -> [f64; FEATURE_COUNT] {
        let driver = self.tables.driver(code);
        let team = self.tables.team_for_driver(code);
        let track = self.tables.track(round);
        let hist = history::estimate(&driver, &track, rng);

        let mut features = [0.0; FEATURE_COUNT];
        let mut i = 0;
        let mut push = |v: f64| {
            features[i] = v;
            i += 1;
        };

        driver.to_array().iter().for_each(|r| push(r / 100.0));
        team.to_array().iter().for_each(|r| push(r / 100.0));
        track.to_array().iter().for_each(|v| push(*v));
        hist.normalized().iter().for_each(|v| push(*v));
        push(ctx.season_progress);
        push(ctx.championship_pressure / MAX_PRESSURE);
        ctx.weather.flags().iter().for_each(|v| push(*v));
        push(self.tables.synergy(code));

        debug_assert_eq!(i, FEATURE_COUNT);
        features
    }

    /// Single-driver call; draws its own race context.
    pub fn build_driver_features<R: Rng + ?Sized>(
        &self,
        code: &str,
        year: i32,
        round: u32,
        rng: &mut R,
    ) -> RaceFeatures {
        self.build_race_features(&[code.to_string()], year, round, rng)
    }

    /// Batch call; the race context is drawn exactly once for all drivers.
    pub fn build_race_features<R: Rng + ?Sized>(
        &self,
        drivers: &[String],
        year: i32,
        round: u32,
        rng: &mut R,
    ) -> RaceFeatures {
        let track = self.tables.track(round);
        let ctx = context::calculate(round, &track, rng);

        let mut matrix = Array2::<f64>::zeros((drivers.len(), FEATURE_COUNT));
        for (row, code) in drivers.iter().enumerate() {
            let features = self.driver_features(code, round, &ctx, rng);
            for (col, v) in features.iter().enumerate() {
                matrix[(row, col)] = *v;
            }
        }

        RaceFeatures {
            year,
            round,
            drivers: drivers.to_vec(),
            matrix,
            context: ctx,
        }
    }
}

/// Mean of a column range of one feature row.
pub fn block_mean(row: &[f64], block: std::ops::Range<usize>) -> f64 {
    let len = block.len() as f64;
    row[block].iter().sum::<f64>() / len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::DriverRating;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn roster(tables: &AttributeTables) -> Vec<String> {
        tables.roster().to_vec()
    }

    #[test]
    fn test_feature_layout() {
        assert_eq!(COMPETITOR_BLOCK.len(), 13);
        assert_eq!(TRACK_BLOCK.len(), 8);
        assert!(TRACK_BLOCK.end < FEATURE_COUNT);
    }

    #[test]
    fn test_values_roughly_unit_range() {
        let tables = AttributeTables::season_2025();
        let builder = FeatureBuilder::new(&tables);
        let mut rng = StdRng::seed_from_u64(3);
        for round in 1..=24 {
            let rf = builder.build_race_features(&roster(&tables), 2025, round, &mut rng);
            assert_eq!(rf.matrix.dim(), (tables.roster().len(), FEATURE_COUNT));
            for v in rf.matrix.iter() {
                assert!(*v >= 0.0 && *v <= 1.1, "round {} value {}", round, v);
            }
        }
    }

    #[test]
    fn test_unknown_driver_uses_neutral_ratings() {
        let tables = AttributeTables::season_2025();
        let builder = FeatureBuilder::new(&tables);
        let rf = builder.build_driver_features("NEW", 2025, 1, &mut StdRng::seed_from_u64(1));
        let row = rf.matrix.row(0);
        for col in COMPETITOR_BLOCK {
            assert!((row[col] - 0.75).abs() < 1e-12);
        }
        assert_eq!(row[FEATURE_COUNT - 1], 1.0);
        assert_eq!(DriverRating::NEUTRAL.skill / 100.0, 0.75);
    }

    #[test]
    fn test_batch_shares_context() {
        let tables = AttributeTables::season_2025();
        let builder = FeatureBuilder::new(&tables);
        let mut rng = StdRng::seed_from_u64(17);
        for round in 1..=24 {
            let rf = builder.build_race_features(&roster(&tables), 2025, round, &mut rng);
            let first = rf.matrix.row(0).to_owned();
            for row in rf.matrix.rows() {
                for col in 25..29 {
                    assert_eq!(row[col], first[col]);
                }
                for col in TRACK_BLOCK {
                    assert_eq!(row[col], first[col]);
                }
            }
            let flags = rf.context.weather.flags();
            assert_eq!(first[27], flags[0]);
            assert_eq!(first[28], flags[1]);
        }
    }

    #[test]
    fn test_same_seed_same_matrix() {
        let tables = AttributeTables::season_2025();
        let builder = FeatureBuilder::new(&tables);
        let a = builder.build_race_features(&roster(&tables), 2025, 5, &mut StdRng::seed_from_u64(8));
        let b = builder.build_race_features(&roster(&tables), 2025, 5, &mut StdRng::seed_from_u64(8));
        assert_eq!(a.matrix, b.matrix);
        assert_eq!(a.context, b.context);
    }

    #[test]
    fn test_block_mean() {
        let row = [1.0, 3.0, 5.0, 7.0];
        assert_eq!(block_mean(&row, 0..2), 2.0);
        assert_eq!(block_mean(&row, 1..4), 5.0);
    }
}
