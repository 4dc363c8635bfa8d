//! Simulated historical form.
//!
//! Real per-track results are not available to the core, so recent form is
//! approximated from skill ratings: qualifying pace matters more on tracks where
//! overtaking is hard, race-craft everywhere else.

use rand::Rng;
use serde::Serialize;

use crate::attributes::{DriverRating, TrackProfile};
use crate::noise::{clip, gaussian};

/// Above this overtaking difficulty grid position decides the race.
pub const OVERTAKING_THRESHOLD: f64 = 0.7;
pub const POSITION_NOISE: f64 = 2.0;
/// Races used for the podium and win counts.
pub const HISTORY_WINDOW: u32 = 10;

const GRID_SIZE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoricalPerformance {
    pub avg_finish: f64,
    pub avg_grid: f64,
    pub podiums: u32,
    pub wins: u32,
}

impl HistoricalPerformance {
    /// The four history features, each clipped to [0, 1] with 1 being best.
    pub fn normalized(&self) -> [f64; 4] {
        let window = HISTORY_WINDOW as f64;
        [
            clip(1.0 - (self.avg_finish - 1.0) / (GRID_SIZE - 1.0), 0.0, 1.0),
            clip(1.0 - (self.avg_grid - 1.0) / (GRID_SIZE - 1.0), 0.0, 1.0),
            clip(self.podiums as f64 / window, 0.0, 1.0),
            clip(self.wins as f64 / window, 0.0, 1.0),
        ]
    }
}

/// Linear map of a 60..100 combined rating onto a 20..1 finishing position.
pub fn expected_position(combined_rating: f64) -> f64 {
    clip(
        GRID_SIZE - (combined_rating - 60.0) / 40.0 * (GRID_SIZE - 1.0),
        1.0,
        GRID_SIZE,
    )
}

/// Skill blend for race day at this track.
pub fn race_rating(driver: &DriverRating, track: &TrackProfile) -> f64 {
    if track.overtaking_difficulty > OVERTAKING_THRESHOLD {
        0.6 * driver.skill + 0.4 * driver.qualifying
    } else {
        0.6 * driver.skill + 0.4 * driver.race_craft
    }
}

pub fn estimate<R: Rng + ?Sized>(
    driver: &DriverRating,
    track: &TrackProfile,
    rng: &mut R,
) -> HistoricalPerformance {
    let expected_finish = expected_position(race_rating(driver, track));
    let expected_grid = expected_position(0.6 * driver.skill + 0.4 * driver.qualifying);

    let avg_finish = clip(
        expected_finish + gaussian(rng, POSITION_NOISE),
        1.0,
        GRID_SIZE,
    );
    let avg_grid = clip(expected_grid + gaussian(rng, POSITION_NOISE), 1.0, GRID_SIZE);

    let mut podiums = 0;
    let mut wins = 0;
    for _ in 0..HISTORY_WINDOW {
        let finish = clip(
            (expected_finish + gaussian(rng, POSITION_NOISE)).round(),
            1.0,
            GRID_SIZE,
        );
        if finish <= 3.0 {
            podiums += 1;
        }
        if finish <= 1.0 {
            wins += 1;
        }
    }

    HistoricalPerformance {
        avg_finish,
        avg_grid,
        podiums,
        wins,
    }
}
