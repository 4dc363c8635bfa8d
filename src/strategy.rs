use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::attributes::{AttributeTables, Compound, RaceInfo, TrackType};
use crate::config::StrategyConfig;
use crate::data::{split_stints, LapDataSource, ObservedStint};
use crate::degradation::{CompoundDegradation, DegradationModel};
use crate::error::StrategyError;
use crate::noise::clip;

// stop windows, in laps from the start and end of the race
const ONE_STOP_MARGIN: i64 = 10;
const TWO_STOP_FIRST_MIN: i64 = 8;
const TWO_STOP_FIRST_END_MARGIN: i64 = 15;
const TWO_STOP_GAP: i64 = 8;
const TWO_STOP_END_MARGIN: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stint {
    pub compound: Compound,
    pub laps: u32,
}

/// One evaluated stop plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyCandidate {
    pub stops: u32,
    pub stints: Vec<Stint>,
    /// lap on which each stop is made
    pub pit_laps: Vec<u32>,
    pub total_time: f64,
    /// the pit lane share of total_time
    pub pit_time: f64,
}

impl StrategyCandidate {
    fn new(stints: Vec<Stint>, pit_laps: Vec<u32>, base_lap_time: f64, pit_loss: f64) -> Self {
        let stops = stints.len().saturating_sub(1) as u32;
        let pit_time = stops as f64 * pit_loss;
        let total_time = stints
            .iter()
            .map(|s| stint_time(base_lap_time, s.compound, s.laps))
            .sum::<f64>()
            + pit_time;
        Self {
            stops,
            stints,
            pit_laps,
            total_time,
            pit_time,
        }
    }

    pub fn total_laps(&self) -> u32 {
        self.stints.iter().map(|s| s.laps).sum()
    }

    /// e.g. "MEDIUM-HARD"
    pub fn label(&self) -> String {
        self.stints
            .iter()
            .map(|s| s.compound.as_str())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Time for `laps` laps on a fresh set: sum over i of (base + pace delta + degradation * i).
pub fn stint_time(base_lap_time: f64, compound: Compound, laps: u32) -> f64 {
    let profile = compound.profile();
    let n = laps as f64;
    n * (base_lap_time + profile.pace_delta) + profile.degradation_rate * n * (n - 1.0) / 2.0
}

/// What the driver actually did, if the lap source knows
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ActualStrategy {
    Available {
        stints: Vec<ObservedStint>,
        pit_laps: Vec<u32>,
        total_time: f64,
        observed_degradation: Vec<CompoundDegradation>,
    },
    Unavailable {
        error: String,
    },
}

impl ActualStrategy {
    pub fn total_time(&self) -> Option<f64> {
        match self {
            ActualStrategy::Available { total_time, .. } => Some(*total_time),
            ActualStrategy::Unavailable { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ActualStrategy::Available { .. } => None,
            ActualStrategy::Unavailable { error } => Some(error.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StrategySource {
    Optimizer { candidates: usize },
    Fallback { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackConditions {
    pub track_type: TrackType,
    pub race_laps: u32,
    pub base_lap_time: f64,
    pub pit_loss: f64,
    pub tire_degradation: f64,
    pub overtaking_difficulty: f64,
    pub safety_car_probability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub race_info: RaceInfo,
    pub driver: String,
    pub optimal_strategy: StrategyCandidate,
    pub ranked_candidates: Vec<StrategyCandidate>,
    pub actual_strategy: ActualStrategy,
    /// actual minus optimal, clipped; absent without lap data
    pub time_savings: Option<f64>,
    pub available_compounds: Vec<Compound>,
    pub track_conditions: TrackConditions,
    pub source: StrategySource,
}

pub struct StrategyOptimizer {
    tables: Arc<AttributeTables>,
    laps: Box<dyn LapDataSource>,
    config: StrategyConfig,
}

impl StrategyOptimizer {
    pub fn new(tables: Arc<AttributeTables>, laps: Box<dyn LapDataSource>, config: StrategyConfig) -> Self {
        Self {
            tables,
            laps,
            config,
        }
    }

    /// Every eligible 1-stop and 2-stop plan, in enumeration order.
    /// Stop jitter is drawn once per compound combination.
    pub fn enumerate_candidates<R: Rng + ?Sized>(
        &self,
        race_laps: u32,
        base_lap_time: f64,
        rng: &mut R,
    ) -> Vec<StrategyCandidate> {
        let l = race_laps as i64;
        let pit_loss = self.config.pit_loss;
        let one_j = i64::from(self.config.one_stop_jitter.unsigned_abs());
        let two_j = i64::from(self.config.two_stop_jitter.unsigned_abs());
        let mut candidates = Vec::new();

        for c1 in Compound::DRY {
            for c2 in Compound::DRY {
                if c1 == c2 {
                    continue;
                }
                let jitter = rng.gen_range(-one_j..=one_j);
                let pit = (l / 2 + jitter).min(l - ONE_STOP_MARGIN).max(ONE_STOP_MARGIN);
                let lens = [pit, l - pit];
                if lens.iter().any(|n| *n <= 0) {
                    continue;
                }
                candidates.push(StrategyCandidate::new(
                    vec![
                        Stint { compound: c1, laps: lens[0] as u32 },
                        Stint { compound: c2, laps: lens[1] as u32 },
                    ],
                    vec![pit as u32],
                    base_lap_time,
                    pit_loss,
                ));
            }
        }

        for c1 in Compound::DRY {
            for c2 in Compound::DRY {
                for c3 in Compound::DRY {
                    if c1 == c2 && c2 == c3 {
                        continue;
                    }
                    let j1 = rng.gen_range(-two_j..=two_j);
                    let j2 = rng.gen_range(-two_j..=two_j);
                    let pit1 = (l / 3 + j1)
                        .min(l - TWO_STOP_FIRST_END_MARGIN)
                        .max(TWO_STOP_FIRST_MIN);
                    let pit2 = (2 * l / 3 + j2)
                        .min(l - TWO_STOP_END_MARGIN)
                        .max(pit1 + TWO_STOP_GAP);
                    let lens = [pit1, pit2 - pit1, l - pit2];
                    if lens.iter().any(|n| *n <= 0) {
                        continue;
                    }
                    candidates.push(StrategyCandidate::new(
                        vec![
                            Stint { compound: c1, laps: lens[0] as u32 },
                            Stint { compound: c2, laps: lens[1] as u32 },
                            Stint { compound: c3, laps: lens[2] as u32 },
                        ],
                        vec![pit1 as u32, pit2 as u32],
                        base_lap_time,
                        pit_loss,
                    ));
                }
            }
        }
        candidates
    }

    /// Optimal plan plus all candidates ranked by time.
    pub fn search<R: Rng + ?Sized>(
        &self,
        race_laps: u32,
        base_lap_time: f64,
        rng: &mut R,
    ) -> Result<(StrategyCandidate, Vec<StrategyCandidate>), StrategyError> {
        let candidates = self.enumerate_candidates(race_laps, base_lap_time, rng);
        let best = select_optimal(&candidates)
            .cloned()
            .ok_or(StrategyError::NoFeasibleStrategy { laps: race_laps })?;

        let mut ranked = candidates;
        ranked.sort_by(|a, b| a.total_time.total_cmp(&b.total_time));
        Ok((best, ranked))
    }

    /// MEDIUM for half the race, HARD for the rest.
    pub fn fallback_strategy(&self, race_laps: u32, base_lap_time: f64) -> StrategyCandidate {
        let first = race_laps / 2;
        let stints: Vec<Stint> = [(Compound::Medium, first), (Compound::Hard, race_laps - first)]
            .into_iter()
            .filter(|(_, laps)| *laps > 0)
            .map(|(compound, laps)| Stint { compound, laps })
            .collect();
        let pit_laps = if stints.len() > 1 { vec![first] } else { Vec::new() };
        let stops = stints.len().saturating_sub(1) as u32;
        let pit_time = stops as f64 * self.config.pit_loss;
        StrategyCandidate {
            stops,
            stints,
            pit_laps,
            total_time: base_lap_time * race_laps as f64 + pit_time,
            pit_time,
        }
    }

    /// Scores a hand-written plan such as `[("MEDIUM", 29), ("HARD", 29)]` for a round.
    pub fn evaluate_plan(&self, round: u32, plan: &[(&str, u32)]) -> Result<StrategyCandidate, StrategyError> {
        let race_laps = self.tables.race_laps(round);
        let stints = plan
            .iter()
            .map(|(name, laps)| {
                name.parse::<Compound>()
                    .map(|compound| Stint { compound, laps: *laps })
                    .map_err(|_| StrategyError::UnknownCompound(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let planned: u32 = stints.iter().map(|s| s.laps).sum();
        if stints.iter().any(|s| s.laps == 0) || planned != race_laps {
            return Err(StrategyError::PlanLength {
                laps: race_laps,
                planned,
            });
        }

        let pit_laps = stints[..stints.len() - 1]
            .iter()
            .scan(0, |lap, s| {
                *lap += s.laps;
                Some(*lap)
            })
            .collect();
        Ok(StrategyCandidate::new(
            stints,
            pit_laps,
            self.tables.base_lap_time(round),
            self.config.pit_loss,
        ))
    }

    pub fn actual_strategy(&self, year: i32, round: u32, driver: &str) -> ActualStrategy {
        match self.laps.lap_records(year, round, driver) {
            Ok(laps) => {
                let (stints, pit_laps) = split_stints(&laps);
                let total_time = laps.iter().map(|l| l.lap_time).sum();
                let observed_degradation = DegradationModel::new(&laps).summary();
                debug!(
                    "{} laps, {} stints observed for {} in {} round {}",
                    laps.len(),
                    stints.len(),
                    driver,
                    year,
                    round
                );
                ActualStrategy::Available {
                    stints,
                    pit_laps,
                    total_time,
                    observed_degradation,
                }
            }
            Err(e) => {
                debug!("actual strategy unavailable: {}", e);
                ActualStrategy::Unavailable { error: e.to_string() }
            }
        }
    }

    pub fn track_conditions(&self, round: u32) -> TrackConditions {
        let track = self.tables.track(round);
        TrackConditions {
            track_type: self.tables.track_type(round),
            race_laps: self.tables.race_laps(round),
            base_lap_time: self.tables.base_lap_time(round),
            pit_loss: self.config.pit_loss,
            tire_degradation: track.tire_degradation,
            overtaking_difficulty: track.overtaking_difficulty,
            safety_car_probability: track.safety_car_probability,
        }
    }

    /// Best stop plan for a driver, compared with what they actually did.
    /// Search failures degrade to the fixed MEDIUM-HARD plan.
    pub fn optimize_strategy<R: Rng + ?Sized>(
        &self,
        year: i32,
        round: u32,
        driver: &str,
        rng: &mut R,
    ) -> StrategyReport {
        let race_laps = self.tables.race_laps(round);
        let base_lap_time = self.tables.base_lap_time(round);

        let (optimal_strategy, ranked_candidates, source) =
            match self.search(race_laps, base_lap_time, rng) {
                Ok((best, ranked)) => {
                    info!(
                        "optimal strategy for {} round {}: {} ({} stops, {:.1}s)",
                        driver,
                        round,
                        best.label(),
                        best.stops,
                        best.total_time
                    );
                    let candidates = ranked.len();
                    (best, ranked, StrategySource::Optimizer { candidates })
                }
                Err(e) => {
                    warn!("strategy search failed, using fallback: {}", e);
                    let fallback = self.fallback_strategy(race_laps, base_lap_time);
                    (
                        fallback.clone(),
                        vec![fallback],
                        StrategySource::Fallback { reason: e.to_string() },
                    )
                }
            };

        let actual_strategy = self.actual_strategy(year, round, driver);
        let limit = self.config.max_time_savings.abs();
        let time_savings = actual_strategy
            .total_time()
            .map(|actual| clip(actual - optimal_strategy.total_time, -limit, limit));

        StrategyReport {
            race_info: self.tables.race_info(year, round),
            driver: driver.to_string(),
            optimal_strategy,
            ranked_candidates,
            actual_strategy,
            time_savings,
            available_compounds: Compound::DRY.to_vec(),
            track_conditions: self.track_conditions(round),
            source,
        }
    }
}

/// Minimum total time; on a tie the earlier candidate wins.
pub fn select_optimal(candidates: &[StrategyCandidate]) -> Option<&StrategyCandidate> {
    candidates.iter().fold(None, |best: Option<&StrategyCandidate>, c| match best {
        Some(b) if b.total_time <= c.total_time => Some(b),
        _ => Some(c),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{InMemoryLapSource, LapRecord, NoLapData};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn optimizer() -> StrategyOptimizer {
        StrategyOptimizer::new(
            Arc::new(AttributeTables::season_2025()),
            Box::new(NoLapData),
            StrategyConfig::default(),
        )
    }

    fn assert_valid(c: &StrategyCandidate, laps: u32) {
        assert_eq!(c.total_laps(), laps, "{:?}", c);
        assert!(c.stints.iter().all(|s| s.laps > 0));
        let distinct: HashSet<Compound> = c.stints.iter().map(|s| s.compound).collect();
        assert!(distinct.len() >= 2, "{:?}", c);
        assert_eq!(c.pit_laps.len() as u32, c.stops);
    }

    #[test]
    fn test_stint_time() {
        // 3 laps of MEDIUM at 90s: 270 + 0.03 * (0 + 1 + 2)
        assert!((stint_time(90.0, Compound::Medium, 3) - 270.09).abs() < 1e-9);
        assert!((stint_time(90.0, Compound::Soft, 1) - 89.2).abs() < 1e-9);
        assert_eq!(stint_time(90.0, Compound::Hard, 0), 0.0);
    }

    #[test]
    fn test_candidates_are_valid() {
        let opt = optimizer();
        let mut rng = StdRng::seed_from_u64(5);
        for laps in [30, 44, 53, 58, 71, 78] {
            let candidates = opt.enumerate_candidates(laps, 90.0, &mut rng);
            assert_eq!(candidates.iter().filter(|c| c.stops == 1).count(), 6);
            assert!(!candidates.is_empty());
            for c in &candidates {
                assert_valid(c, laps);
            }
        }
    }

    #[test]
    fn test_one_stop_window() {
        let opt = optimizer();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            for c in opt.enumerate_candidates(58, 85.0, &mut rng) {
                if c.stops == 1 {
                    assert!((24..=34).contains(&c.pit_laps[0]));
                } else {
                    assert!(c.pit_laps[0] >= 8 && c.pit_laps[0] <= 43);
                    assert!(c.pit_laps[1] >= c.pit_laps[0] + 8);
                    assert!(c.pit_laps[1] <= 50);
                }
            }
        }
    }

    #[test]
    fn test_search_returns_minimum() {
        let opt = optimizer();
        let (best, ranked) = opt.search(57, 95.0, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(best.total_time, ranked[0].total_time);
        assert!(ranked.windows(2).all(|w| w[0].total_time <= w[1].total_time));
        assert!(ranked.iter().all(|c| c.total_time >= best.total_time));
    }

    #[test]
    fn test_tie_keeps_first_found() {
        let a = StrategyCandidate::new(
            vec![
                Stint { compound: Compound::Medium, laps: 10 },
                Stint { compound: Compound::Hard, laps: 10 },
            ],
            vec![10],
            90.0,
            25.0,
        );
        let mut b = a.clone();
        b.pit_laps = vec![11];
        let candidates = vec![a.clone(), b];
        assert_eq!(select_optimal(&candidates).unwrap().pit_laps, vec![10]);
        assert!(select_optimal(&[]).is_none());
    }

    #[test]
    fn test_same_seed_same_strategy() {
        let opt = optimizer();
        let a = opt.optimize_strategy(2025, 4, "VER", &mut StdRng::seed_from_u64(9));
        let b = opt.optimize_strategy(2025, 4, "VER", &mut StdRng::seed_from_u64(9));
        assert_eq!(a.optimal_strategy, b.optimal_strategy);
        assert_eq!(a.ranked_candidates, b.ranked_candidates);
    }

    #[test]
    fn test_extreme_jitter_is_clamped() {
        let opt = StrategyOptimizer::new(
            Arc::new(AttributeTables::season_2025()),
            Box::new(NoLapData),
            StrategyConfig {
                one_stop_jitter: i32::MIN,
                two_stop_jitter: i32::MIN,
                ..StrategyConfig::default()
            },
        );
        let report = opt.optimize_strategy(2025, 1, "VER", &mut StdRng::seed_from_u64(13));
        assert!(matches!(report.source, StrategySource::Optimizer { .. }));
        for c in &report.ranked_candidates {
            assert_valid(c, 58);
            if c.stops == 1 {
                assert!((10..=48).contains(&c.pit_laps[0]));
            }
        }
    }

    #[test]
    fn test_short_race_falls_back() {
        let opt = optimizer();
        assert!(matches!(
            opt.search(10, 90.0, &mut StdRng::seed_from_u64(1)),
            Err(StrategyError::NoFeasibleStrategy { laps: 10 })
        ));

        let fallback = opt.fallback_strategy(10, 90.0);
        assert_eq!(fallback.stints[0].compound, Compound::Medium);
        assert_eq!(fallback.stints[1].compound, Compound::Hard);
        assert_eq!(fallback.total_laps(), 10);
        assert_eq!(fallback.pit_laps, vec![5]);
        assert_eq!(fallback.total_time, 90.0 * 10.0 + 25.0);
    }

    #[test]
    fn test_evaluate_plan() {
        let opt = optimizer();
        // round 1: 58 laps at 85s
        let plan = opt.evaluate_plan(1, &[("medium", 29), ("HARD", 29)]).unwrap();
        assert_eq!(plan.pit_laps, vec![29]);
        let expected = stint_time(85.0, Compound::Medium, 29) + stint_time(85.0, Compound::Hard, 29) + 25.0;
        assert!((plan.total_time - expected).abs() < 1e-9);

        assert!(matches!(
            opt.evaluate_plan(1, &[("SUPERSOFT", 29), ("HARD", 29)]),
            Err(StrategyError::UnknownCompound(_))
        ));
        assert!(matches!(
            opt.evaluate_plan(1, &[("SOFT", 20), ("HARD", 20)]),
            Err(StrategyError::PlanLength { laps: 58, planned: 40 })
        ));
        assert!(opt.evaluate_plan(1, &[]).is_err());
    }

    #[test]
    fn test_no_telemetry_reports_error() {
        let opt = optimizer();
        let report = opt.optimize_strategy(2025, 8, "LEC", &mut StdRng::seed_from_u64(2));
        assert!(report.actual_strategy.error().unwrap().contains("LEC"));
        assert!(report.time_savings.is_none());
        assert_eq!(report.race_info.circuit, "Circuit de Monaco");
        assert_eq!(report.track_conditions.race_laps, 78);
        assert!(matches!(report.source, StrategySource::Optimizer { .. }));
        assert_valid(&report.optimal_strategy, 78);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["actual_strategy"]["error"].is_string());
        assert!(json["time_savings"].is_null());
    }

    #[test]
    fn test_actual_strategy_and_savings() {
        let tables = Arc::new(AttributeTables::season_2025());
        let laps_total = tables.race_laps(1);
        let base = tables.base_lap_time(1);
        let laps: Vec<LapRecord> = (1..=laps_total)
            .map(|n| {
                let (compound, life) = if n <= 20 {
                    (Compound::Soft, n)
                } else {
                    (Compound::Hard, n - 20)
                };
                LapRecord {
                    lap_number: n,
                    compound,
                    lap_time: base + 0.5 + 0.04 * life as f64,
                    tyre_life: life,
                    is_pit_out_lap: false,
                    is_pit_in_lap: false,
                }
            })
            .collect();
        let mut source = InMemoryLapSource::new();
        source.insert(2025, 1, "NOR", laps);

        let opt = StrategyOptimizer::new(tables, Box::new(source), StrategyConfig::default());
        let report = opt.optimize_strategy(2025, 1, "NOR", &mut StdRng::seed_from_u64(4));

        match &report.actual_strategy {
            ActualStrategy::Available {
                stints,
                pit_laps,
                observed_degradation,
                ..
            } => {
                assert_eq!(stints.len(), 2);
                assert_eq!(pit_laps, &vec![21]);
                assert_eq!(observed_degradation.len(), 2);
            }
            other => panic!("expected lap data, got {:?}", other),
        }
        let savings = report.time_savings.unwrap();
        assert!((-30.0..=30.0).contains(&savings));
    }
}
