use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use counterbalance_core::matrix::ViabilityMap;
use counterbalance_core::sweep::{environment_scan, initial_condition_scan, ScanConfig};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "counterbalance")]
#[command(about = "Protocell viability-map scans")]
struct Cli {
    /// Which quantity pair to sweep
    #[arg(value_enum)]
    mode: Mode,

    /// Side length of the output matrix
    #[arg(long, default_value_t = 100)]
    resolution: usize,

    /// Starting location of the behaving cell (initial-conditions mode)
    #[arg(long, default_value_t = 0.0)]
    initial_location: f64,

    /// Evaluate half the (N, F) grid and mirror it (environment mode)
    #[arg(long)]
    symmetry: bool,

    /// Where to write the resulting matrix as JSON
    #[arg(long, default_value = "viability.json")]
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Sweep initial metabolite concentrations (A0, B0) over [0, 20]
    InitialConditions,
    /// Sweep fixed environmental supplies (N, F) over [0, 50]
    Environment,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();
    let mut config = ScanConfig::new(cli.resolution);
    config.initial_location = cli.initial_location;
    config.exploit_symmetry = cli.symmetry;

    let started = Instant::now();
    let map = match cli.mode {
        Mode::InitialConditions => initial_condition_scan(&config)?,
        Mode::Environment => environment_scan(&config)?,
    };
    info!(
        elapsed_s = started.elapsed().as_secs_f64(),
        "scan finished"
    );
    match cli.mode {
        Mode::InitialConditions => log_outcome_tally(&map),
        Mode::Environment => log_score_summary(&map),
    }

    let file = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    serde_json::to_writer(BufWriter::new(file), &MapDocument::from(&map))
        .with_context(|| format!("writing {}", cli.output.display()))?;
    info!(path = %cli.output.display(), "matrix written");
    Ok(())
}

/// JSON cannot carry NaN, so indeterminate cells are written as null.
#[derive(serde::Serialize)]
struct MapDocument {
    resolution: usize,
    values: Vec<Option<f64>>,
}

impl From<&ViabilityMap> for MapDocument {
    fn from(map: &ViabilityMap) -> Self {
        Self {
            resolution: map.resolution(),
            values: map
                .as_slice()
                .iter()
                .map(|v| if v.is_nan() { None } else { Some(*v) })
                .collect(),
        }
    }
}

fn log_outcome_tally(map: &ViabilityMap) {
    let mut survive = 0usize;
    let mut crisis = 0usize;
    let mut starve = 0usize;
    let mut indeterminate = 0usize;
    for &v in map.as_slice() {
        if v.is_nan() {
            indeterminate += 1;
        } else if v == 1.0 {
            crisis += 1;
        } else if v == -1.0 {
            starve += 1;
        } else {
            survive += 1;
        }
    }
    info!(survive, crisis, starve, indeterminate, "outcome tally");
}

fn log_score_summary(map: &ViabilityMap) {
    let cells = map.as_slice();
    let mean = cells.iter().sum::<f64>() / cells.len() as f64;
    let viable = cells.iter().filter(|v| **v > 0.0).count();
    info!(mean_score = mean, viable_cells = viable, "score summary");
}
