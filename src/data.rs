use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::ReaderBuilder;
use tracing::debug;

use crate::attributes::{AttributeTables, Compound};
use crate::error::DataError;

// column names as exported by the timing feed
#[derive(Debug, Deserialize)]
struct RawLapData {
    #[serde(rename = "Driver")] driver: String,
    #[serde(rename = "LapNumber")] lap_number: f64,
    #[serde(rename = "Compound")] compound: String,
    #[serde(rename = "TyreLife", default)] tyre_life: Option<f64>,
    #[serde(rename = "LapTimeSeconds")] lap_time_seconds: Option<f64>,
    #[serde(rename = "PitOutTime", default)] pit_out_time: Option<String>,
    #[serde(rename = "PitInTime", default)] pit_in_time: Option<String>,
}

/// One timed lap of a driver's race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap_number: u32,
    pub compound: Compound,
    pub lap_time: f64,
    /// laps on this set of tires, counted from 1
    pub tyre_life: u32,
    pub is_pit_out_lap: bool,
    pub is_pit_in_lap: bool,
}

/// Source of real lap-by-lap race data.
pub trait LapDataSource: Send + Sync {
    fn lap_records(&self, year: i32, round: u32, driver: &str) -> Result<Vec<LapRecord>, DataError>;
}

/// Source of the drivers entered for a season.
pub trait RosterSource: Send + Sync {
    fn active_competitors(&self, year: i32) -> Vec<String>;
}

/// Roster taken from the attribute tables, identical for every year.
pub struct StaticRoster {
    tables: Arc<AttributeTables>,
}

impl StaticRoster {
    pub fn new(tables: Arc<AttributeTables>) -> Self {
        Self { tables }
    }
}

impl RosterSource for StaticRoster {
    fn active_competitors(&self, _year: i32) -> Vec<String> {
        self.tables.roster().to_vec()
    }
}

impl RosterSource for Vec<String> {
    fn active_competitors(&self, _year: i32) -> Vec<String> {
        self.clone()
    }
}

/// Source with no data at all; every request is unavailable.
pub struct NoLapData;

impl LapDataSource for NoLapData {
    fn lap_records(&self, year: i32, round: u32, driver: &str) -> Result<Vec<LapRecord>, DataError> {
        Err(DataError::Unavailable {
            year,
            round,
            driver: driver.to_string(),
        })
    }
}

/// Lap data held in memory, keyed by (year, round, driver)
#[derive(Default)]
pub struct InMemoryLapSource {
    laps: HashMap<(i32, u32, String), Vec<LapRecord>>,
}

impl InMemoryLapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: i32, round: u32, driver: &str, mut laps: Vec<LapRecord>) {
        laps.sort_by_key(|l| l.lap_number);
        self.laps.insert((year, round, driver.to_uppercase()), laps);
    }
}

impl LapDataSource for InMemoryLapSource {
    fn lap_records(&self, year: i32, round: u32, driver: &str) -> Result<Vec<LapRecord>, DataError> {
        match self.laps.get(&(year, round, driver.to_uppercase())) {
            Some(laps) if !laps.is_empty() => Ok(laps.clone()),
            _ => Err(DataError::Unavailable {
                year,
                round,
                driver: driver.to_string(),
            }),
        }
    }
}

/// Reads `<year>_<round>.csv` files (round zero-padded to two digits) from a directory.
pub struct CsvLapSource {
    dir: PathBuf,
}

impl CsvLapSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn file_for(&self, year: i32, round: u32) -> PathBuf {
        self.dir.join(format!("{}_{:02}.csv", year, round))
    }
}

impl LapDataSource for CsvLapSource {
    fn lap_records(&self, year: i32, round: u32, driver: &str) -> Result<Vec<LapRecord>, DataError> {
        let unavailable = || DataError::Unavailable {
            year,
            round,
            driver: driver.to_string(),
        };

        let path = self.file_for(year, round);
        if !path.exists() {
            debug!("no lap file at {:?}", path);
            return Err(unavailable());
        }

        let mut reader = ReaderBuilder::new().has_headers(true).from_path(&path)?;
        let wanted = driver.to_uppercase();
        let mut laps = Vec::new();

        for res in reader.deserialize() {
            let raw: RawLapData = res?;
            if raw.driver.to_uppercase() != wanted {
                continue;
            }
            // laps without a time or a known compound carry nothing for the strategy comparison
            let Some(lap_time) = raw.lap_time_seconds.filter(|t| *t > 0.0 && *t < 300.0) else {
                continue;
            };
            let Ok(compound) = raw.compound.parse::<Compound>() else {
                continue;
            };
            if raw.lap_number < 1.0 {
                continue;
            }
            laps.push(LapRecord {
                lap_number: raw.lap_number.round() as u32,
                compound,
                lap_time,
                tyre_life: raw.tyre_life.unwrap_or(0.0).max(0.0).round() as u32,
                is_pit_out_lap: raw.pit_out_time.is_some_and(|s| !s.trim().is_empty()),
                is_pit_in_lap: raw.pit_in_time.is_some_and(|s| !s.trim().is_empty()),
            });
        }

        if laps.is_empty() {
            return Err(unavailable());
        }
        laps.sort_by_key(|l| l.lap_number);
        Ok(laps)
    }
}

/// A stint reconstructed from lap data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedStint {
    pub compound: Compound,
    pub laps: u32,
    pub start_lap: u32,
    pub end_lap: u32,
}

/// Split laps into stints on every compound change.
/// Returns the stints and the laps on which the new compound first appears.
pub fn split_stints(laps: &[LapRecord]) -> (Vec<ObservedStint>, Vec<u32>) {
    let mut stints = Vec::new();
    let mut pit_laps = Vec::new();
    let Some(first) = laps.first() else {
        return (stints, pit_laps);
    };

    let mut compound = first.compound;
    let mut start_lap = first.lap_number;

    for lap in &laps[1..] {
        if lap.compound != compound {
            if lap.lap_number > start_lap {
                stints.push(ObservedStint {
                    compound,
                    laps: lap.lap_number - start_lap,
                    start_lap,
                    end_lap: lap.lap_number - 1,
                });
                pit_laps.push(lap.lap_number);
            }
            compound = lap.compound;
            start_lap = lap.lap_number;
        }
    }

    let final_lap = laps.iter().map(|l| l.lap_number).max().unwrap_or(start_lap);
    if final_lap >= start_lap {
        stints.push(ObservedStint {
            compound,
            laps: final_lap - start_lap + 1,
            start_lap,
            end_lap: final_lap,
        });
    }
    (stints, pit_laps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn lap(n: u32, compound: Compound, time: f64, life: u32) -> LapRecord {
        LapRecord {
            lap_number: n,
            compound,
            lap_time: time,
            tyre_life: life,
            is_pit_out_lap: false,
            is_pit_in_lap: false,
        }
    }

    #[test]
    fn test_split_stints_two_compounds() {
        let mut laps: Vec<LapRecord> = (1..=5).map(|n| lap(n, Compound::Medium, 100.0, n)).collect();
        laps.extend((6..=9).map(|n| lap(n, Compound::Hard, 101.0, n - 5)));

        let (stints, pits) = split_stints(&laps);
        assert_eq!(stints.len(), 2);
        assert_eq!(stints[0].compound, Compound::Medium);
        assert_eq!(stints[0].laps, 5);
        assert_eq!(stints[1].laps, 4);
        assert_eq!((stints[1].start_lap, stints[1].end_lap), (6, 9));
        assert_eq!(pits, vec![6]);
    }

    #[test]
    fn test_split_stints_empty() {
        let (stints, pits) = split_stints(&[]);
        assert!(stints.is_empty());
        assert!(pits.is_empty());
    }

    #[test]
    fn test_in_memory_source() {
        let mut source = InMemoryLapSource::new();
        source.insert(2025, 1, "ver", vec![lap(2, Compound::Soft, 90.0, 2), lap(1, Compound::Soft, 91.0, 1)]);
        let laps = source.lap_records(2025, 1, "VER").unwrap();
        assert_eq!(laps[0].lap_number, 1);
        assert!(matches!(
            source.lap_records(2025, 2, "VER"),
            Err(DataError::Unavailable { round: 2, .. })
        ));
    }

    #[test]
    fn test_no_lap_data() {
        assert!(matches!(
            NoLapData.lap_records(2024, 5, "HAM"),
            Err(DataError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_csv_source_filters_driver_and_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvLapSource::new(dir.path());
        let mut file = std::fs::File::create(source.file_for(2025, 2)).unwrap();
        writeln!(file, "Driver,LapNumber,Compound,TyreLife,LapTimeSeconds,PitOutTime,PitInTime").unwrap();
        writeln!(file, "VER,1,MEDIUM,1,98.5,,").unwrap();
        writeln!(file, "VER,2,MEDIUM,2,97.9,,0:45:12").unwrap();
        writeln!(file, "VER,3,HARD,1,99.1,0:46:40,").unwrap();
        writeln!(file, "VER,4,UNKNOWN,2,97.0,,").unwrap();
        writeln!(file, "VER,5,HARD,3,,,").unwrap();
        writeln!(file, "LEC,1,SOFT,1,97.0,,").unwrap();
        drop(file);

        let laps = source.lap_records(2025, 2, "VER").unwrap();
        assert_eq!(laps.len(), 3);
        assert!(laps[1].is_pit_in_lap);
        assert!(laps[2].is_pit_out_lap);
        assert_eq!(laps[2].compound, Compound::Hard);

        assert!(matches!(
            source.lap_records(2025, 2, "HAM"),
            Err(DataError::Unavailable { .. })
        ));
        assert!(matches!(
            source.lap_records(2025, 3, "VER"),
            Err(DataError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_static_roster() {
        let tables = Arc::new(AttributeTables::season_2025());
        let roster = StaticRoster::new(tables.clone());
        assert_eq!(roster.active_competitors(2025), tables.roster().to_vec());
        assert_eq!(roster.active_competitors(2030).len(), 19);
    }
}
