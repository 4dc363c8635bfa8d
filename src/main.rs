//! racecast CLI - race outcome predictions and pit-stop strategies as JSON

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use racecast::data::{CsvLapSource, LapDataSource, NoLapData, StaticRoster};
use racecast::{AppConfig, AttributeTables, DriverAnalyzer, ModelStore, RacePredictor, StrategyOptimizer};

#[derive(Parser)]
#[command(name = "racecast")]
#[command(author, version, about = "Race outcome predictor and pit-stop strategy optimizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file; defaults are used for anything missing
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for every random draw of the request
    #[arg(long, global = true, default_value = "42")]
    seed: u64,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the finishing order of a race
    Predict {
        #[arg(short, long, default_value = "2025")]
        year: i32,

        /// Round (1-24)
        #[arg(short, long)]
        round: u32,

        /// Comma separated driver codes; defaults to the season roster
        #[arg(short, long, value_delimiter = ',')]
        drivers: Vec<String>,
    },

    /// Find the fastest pit-stop strategy for a driver
    Strategy {
        #[arg(short, long, default_value = "2025")]
        year: i32,

        #[arg(short, long)]
        round: u32,

        #[arg(short, long)]
        driver: String,

        /// Directory of <year>_<round>.csv lap files
        #[arg(long)]
        laps_dir: Option<PathBuf>,

        /// Score a fixed plan instead, e.g. MEDIUM:29,HARD:29
        #[arg(long, value_delimiter = ',')]
        plan: Vec<String>,
    },

    /// Simulated season performance of one driver
    Driver {
        code: String,
    },

    /// Side by side comparison of several drivers
    Compare {
        #[arg(value_delimiter = ',', required = true)]
        codes: Vec<String>,
    },
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

fn parse_plan(plan: &[String]) -> Result<Vec<(&str, u32)>> {
    plan.iter()
        .map(|stint| {
            let (compound, laps) = stint
                .split_once(':')
                .with_context(|| format!("stint '{}' is not COMPOUND:LAPS", stint))?;
            let laps = laps
                .trim()
                .parse::<u32>()
                .with_context(|| format!("invalid lap count in '{}'", stint))?;
            Ok((compound.trim(), laps))
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path).with_context(|| format!("loading config {:?}", path))?,
        None => AppConfig::default(),
    };
    let tables = Arc::new(AttributeTables::season_2025());
    let mut rng = StdRng::seed_from_u64(cli.seed);

    match cli.command {
        Commands::Predict { year, round, drivers } => {
            let store = Arc::new(ModelStore::new(tables.clone(), config.training));
            let predictor = RacePredictor::new(
                tables.clone(),
                store,
                Box::new(StaticRoster::new(tables)),
                config.prediction,
            );
            let prediction = if drivers.is_empty() {
                predictor.predict_outcome(year, round, &mut rng)?
            } else {
                let drivers: Vec<String> = drivers.iter().map(|d| d.trim().to_uppercase()).collect();
                predictor.predict_for(year, round, &drivers, &mut rng)?
            };
            info!("predicted winner: {}", prediction.winner.driver);
            print_json(&prediction, cli.pretty)
        }
        Commands::Strategy {
            year,
            round,
            driver,
            laps_dir,
            plan,
        } => {
            let laps: Box<dyn LapDataSource> = match laps_dir {
                Some(dir) => {
                    if !dir.is_dir() {
                        bail!("lap directory {:?} does not exist", dir);
                    }
                    Box::new(CsvLapSource::new(dir))
                }
                None => Box::new(NoLapData),
            };
            let optimizer = StrategyOptimizer::new(tables, laps, config.strategy);
            let driver = driver.to_uppercase();

            if plan.is_empty() {
                let report = optimizer.optimize_strategy(year, round, &driver, &mut rng);
                print_json(&report, cli.pretty)
            } else {
                let stints = parse_plan(&plan)?;
                let candidate = optimizer.evaluate_plan(round, &stints)?;
                print_json(&candidate, cli.pretty)
            }
        }
        Commands::Driver { code } => {
            let analysis = DriverAnalyzer::new(tables).analyze_driver(&code.to_uppercase(), &mut rng);
            print_json(&analysis, cli.pretty)
        }
        Commands::Compare { codes } => {
            let codes: Vec<String> = codes.iter().map(|c| c.trim().to_uppercase()).collect();
            let comparison = DriverAnalyzer::new(tables).compare_drivers(&codes, &mut rng);
            print_json(&comparison, cli.pretty)
        }
    }
}
