use crate::attributes::Compound;
use crate::data::LapRecord;
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::collections::BTreeMap;
pub type FittedLinearRegression = linfa_linear::FittedLinearRegression<f64>;

/// Fewer clean laps than this on a compound and no fit is attempted.
pub const MIN_LAPS_PER_COMPOUND: usize = 5;

/// Observed wear of one compound over a race
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompoundDegradation {
    pub compound: Compound,
    /// seconds lost per lap of tyre age, floored at 0
    pub seconds_per_lap: f64,
    /// fitted lap time on a fresh tyre
    pub intercept: f64,
    pub laps: usize,
}

pub struct DegradationModel {
    models: BTreeMap<Compound, (FittedLinearRegression, usize)>,
}

impl DegradationModel {
    /// Fits lap time against tyre age for every compound with enough clean laps.
    pub fn new(laps: &[LapRecord]) -> Self {
        let data: Vec<_> = laps
            .iter()
            .filter(|d| !d.is_pit_out_lap && !d.is_pit_in_lap && d.lap_time.is_finite())
            .collect();

        let mut models = BTreeMap::new();
        for comp in Compound::DRY.iter().chain([Compound::Intermediate, Compound::Wet].iter()) {
            if let Some(fitted) = Self::build_model(&data, *comp) {
                models.insert(*comp, fitted);
            }
        }
        Self { models }
    }

    fn build_model(data: &[&LapRecord], comp: Compound) -> Option<(FittedLinearRegression, usize)> {
        let comp_data: Vec<_> = data.iter().filter(|d| d.compound == comp).collect();
        if comp_data.len() < MIN_LAPS_PER_COMPOUND {
            return None;
        }
        // a single tyre age leaves the slope undetermined
        let first_age = comp_data[0].tyre_life;
        if comp_data.iter().all(|d| d.tyre_life == first_age) {
            return None;
        }

        let feats: Vec<f64> = comp_data.iter().map(|d| d.tyre_life as f64).collect();
        let targets: Vec<f64> = comp_data.iter().map(|d| d.lap_time).collect();

        let x = Array2::from_shape_vec((comp_data.len(), 1), feats).ok()?;
        let y = Array1::from_vec(targets);
        let ds = Dataset::new(x, y);

        let model = LinearRegression::new().fit(&ds).ok()?;
        Some((model, comp_data.len()))
    }

    /// Slope and intercept of every fitted compound, dry compounds first.
    pub fn summary(&self) -> Vec<CompoundDegradation> {
        self.models
            .iter()
            .map(|(comp, (m, laps))| CompoundDegradation {
                compound: *comp,
                seconds_per_lap: m.params()[0].max(0.0),
                intercept: m.intercept(),
                laps: *laps,
            })
            .collect()
    }
}
