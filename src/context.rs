use rand::Rng;
use serde::Serialize;

use crate::attributes::{TrackProfile, SEASON_LENGTH};

/// Share of weather variability that turns into a non-dry race.
const NON_DRY_SCALE: f64 = 0.3;
/// Chance a non-dry race is fully wet rather than mixed.
const WET_SHARE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Dry,
    Wet,
    Mixed,
}

impl Weather {
    /// One-hot (wet, mixed); dry is the all-zero case.
    pub fn flags(self) -> [f64; 2] {
        match self {
            Weather::Dry => [0.0, 0.0],
            Weather::Wet => [1.0, 0.0],
            Weather::Mixed => [0.0, 1.0],
        }
    }
}

/// Situational factors shared by every competitor in one race.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DynamicContext {
    pub season_progress: f64,
    pub championship_pressure: f64,
    pub weather: Weather,
    pub safety_car_probability: f64,
}

/// Step function: 0.8 early season, 1.0 for rounds 11-15, 1.2 from round 16.
pub fn championship_pressure(round: u32) -> f64 {
    match round {
        r if r > 15 => 1.2,
        11..=15 => 1.0,
        _ => 0.8,
    }
}

pub fn draw_weather<R: Rng + ?Sized>(track: &TrackProfile, rng: &mut R) -> Weather {
    let p_non_dry = (track.weather_variability * NON_DRY_SCALE).clamp(0.0, 1.0);
    if !rng.gen_bool(p_non_dry) {
        return Weather::Dry;
    }
    if rng.gen_bool(WET_SHARE) {
        Weather::Wet
    } else {
        Weather::Mixed
    }
}

pub fn calculate<R: Rng + ?Sized>(round: u32, track: &TrackProfile, rng: &mut R) -> DynamicContext {
    DynamicContext {
        season_progress: round as f64 / SEASON_LENGTH as f64,
        championship_pressure: championship_pressure(round),
        weather: draw_weather(track, rng),
        safety_car_probability: track.safety_car_probability,
    }
}
