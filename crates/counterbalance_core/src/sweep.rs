//! Grid-scan orchestration: builds the Cartesian grid of evaluation
//! points, fans the points out over a rayon worker pool, and scatters
//! the tagged results back into a viability map.
//!
//! Workers share the configuration read-only and own all of their
//! integration state, so the only synchronization point is the join at
//! the end of the parallel map. Scattering happens afterwards on the
//! calling thread.

use crate::classify::{classify, survival_score, Outcome, Thresholds};
use crate::matrix::{GridCoord, ScanMatrix, ViabilityMap};
use crate::model::{
    BehavingProtocell, FixedEnvironment, ProtocellParams, ACTIVATION, FIXED_MET_A, FIXED_MET_B,
    LOCATION, MET_A, MET_B,
};
use crate::solver::{integrate, uniform_times, Tolerances};
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything the original scripts hard-coded, as explicit knobs.
///
/// One instance configures a whole scan and is shared read-only by all
/// workers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Side length of the output matrix.
    pub resolution: usize,
    /// Vector-field constants.
    pub params: ProtocellParams,
    /// Classifier thresholds.
    pub thresholds: Thresholds,
    /// Integrator step-control tolerances.
    pub tolerances: Tolerances,
    /// Swept range of initial metabolite concentrations.
    pub metabolite_range: (f64, f64),
    /// Swept range of fixed environmental supplies.
    pub environment_range: (f64, f64),
    /// Side length of the initial-condition sub-grid evaluated for each
    /// environment cell.
    pub inner_resolution: usize,
    /// Integration horizon.
    pub horizon: f64,
    /// Output samples per trajectory in the initial-condition sweep.
    pub initial_condition_samples: usize,
    /// Output samples per trajectory in the environment sweep.
    pub environment_samples: usize,
    /// Starting location of the behaving cell.
    pub initial_location: f64,
    /// Starting behavioral activation (0.5 = not moving).
    pub initial_activation: f64,
    /// Environment sweep only: evaluate one anti-diagonal half of the
    /// (N, F) grid and mirror it, exploiting survivability(N, F) =
    /// survivability(F, N).
    pub exploit_symmetry: bool,
}

impl ScanConfig {
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution,
            params: ProtocellParams::default(),
            thresholds: Thresholds::default(),
            tolerances: Tolerances::default(),
            metabolite_range: (0.0, 20.0),
            environment_range: (0.0, 50.0),
            inner_resolution: 50,
            horizon: 800.0,
            initial_condition_samples: 2000,
            environment_samples: 4000,
            initial_location: 0.0,
            initial_activation: 0.5,
            exploit_symmetry: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.resolution < 2 {
            bail!("Scan resolution must be at least 2.");
        }
        if self.inner_resolution == 0 {
            bail!("Inner sub-grid resolution must be positive.");
        }
        if !(self.horizon > 0.0) {
            bail!("Integration horizon must be positive.");
        }
        if self.initial_condition_samples < 2 || self.environment_samples < 2 {
            bail!("Trajectory sampling needs at least two points.");
        }
        let (m_lo, m_hi) = self.metabolite_range;
        let (e_lo, e_hi) = self.environment_range;
        if !(m_lo.is_finite() && m_hi.is_finite() && m_hi > m_lo) {
            bail!("Metabolite range must be finite with max > min.");
        }
        if !(e_lo.is_finite() && e_hi.is_finite() && e_hi > e_lo) {
            bail!("Environment range must be finite with max > min.");
        }
        Ok(())
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![lo];
    }
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + i as f64 * step).collect()
}

/// Simulates one behaving protocell from initial metabolite levels
/// `(a0, b0)` and classifies its fate.
pub fn evaluate_initial_condition(cfg: &ScanConfig, a0: f64, b0: f64) -> Result<Outcome> {
    let field = BehavingProtocell::new(cfg.params);
    let mut x0 = [0.0; 4];
    x0[LOCATION] = cfg.initial_location;
    x0[MET_A] = a0;
    x0[MET_B] = b0;
    x0[ACTIVATION] = cfg.initial_activation;
    let times = uniform_times(cfg.horizon, cfg.initial_condition_samples);
    let traj = integrate(&field, &x0, &times, cfg.tolerances)?;
    Ok(classify(&traj, MET_A, MET_B, &cfg.thresholds))
}

/// Mean survival fraction of the reduced metabolic model under fixed
/// supplies `(n, f)`, taken over the full inner sub-grid of initial
/// metabolite concentrations. The sub-grid runs sequentially inside the
/// one parallel job that owns this cell.
pub fn evaluate_environment(cfg: &ScanConfig, n: f64, f: f64) -> Result<f64> {
    let field = FixedEnvironment::new(cfg.params, n, f);
    let times = uniform_times(cfg.horizon, cfg.environment_samples);
    let (m_lo, m_hi) = cfg.metabolite_range;
    let axis = linspace(m_lo, m_hi, cfg.inner_resolution);

    let mut survived = 0.0;
    for &a0 in &axis {
        for &b0 in &axis {
            let traj = integrate(&field, &[a0, b0], &times, cfg.tolerances)?;
            let outcome = classify(&traj, FIXED_MET_A, FIXED_MET_B, &cfg.thresholds);
            survived += survival_score(outcome);
        }
    }
    Ok(survived / (cfg.inner_resolution * cfg.inner_resolution) as f64)
}

/// Sweeps initial metabolite concentrations `(A0, B0)` over the
/// metabolite range and maps each cell to its outcome label.
///
/// Columns index A0 left to right; rows index B0 top to bottom with the
/// axis reversed, so increasing row means decreasing B0, matching the
/// plot orientation of the published maps.
pub fn initial_condition_scan(cfg: &ScanConfig) -> Result<ViabilityMap> {
    cfg.validate()?;
    let r = cfg.resolution;
    let (lo, hi) = cfg.metabolite_range;
    let a_axis = linspace(lo, hi, r);
    let mut b_axis = linspace(lo, hi, r);
    b_axis.reverse();

    let mut jobs = Vec::with_capacity(r * r);
    for (col, &a0) in a_axis.iter().enumerate() {
        for (row, &b0) in b_axis.iter().enumerate() {
            jobs.push((a0, b0, GridCoord { row, col }));
        }
    }
    info!(
        resolution = r,
        jobs = jobs.len(),
        "starting initial-condition sweep"
    );

    let results: Vec<(GridCoord, f64)> = jobs
        .par_iter()
        .map(|&(a0, b0, coord)| {
            let outcome = evaluate_initial_condition(cfg, a0, b0)?;
            Ok((coord, outcome.label()))
        })
        .collect::<Result<_>>()?;

    let mut matrix = ScanMatrix::new(r);
    for (coord, label) in results {
        matrix
            .scatter(coord, label)
            .context("scattering initial-condition result")?;
    }
    let map = matrix.finish().context("assembling viability map")?;
    info!(resolution = r, "initial-condition sweep complete");
    Ok(map)
}

/// Sweeps the fixed environmental supplies `(N, F)` over the environment
/// range; each cell holds the mean survival fraction of its inner
/// initial-condition sub-grid.
///
/// Columns index N left to right; rows index F top to bottom with the
/// axis reversed. With `exploit_symmetry` set, only cells on or above
/// the anti-diagonal are evaluated and each result is mirrored across
/// it; in this orientation the mirror of (row, col) is
/// (R-1-col, R-1-row), and cells on the anti-diagonal itself are their
/// own mirror, evaluated and written exactly once.
pub fn environment_scan(cfg: &ScanConfig) -> Result<ViabilityMap> {
    cfg.validate()?;
    let r = cfg.resolution;
    let (lo, hi) = cfg.environment_range;
    let n_axis = linspace(lo, hi, r);
    let mut f_axis = linspace(lo, hi, r);
    f_axis.reverse();

    let mut jobs = Vec::with_capacity(r * r);
    for (col, &n) in n_axis.iter().enumerate() {
        for (row, &f) in f_axis.iter().enumerate() {
            if cfg.exploit_symmetry && row + col > r - 1 {
                continue;
            }
            jobs.push((n, f, GridCoord { row, col }));
        }
    }
    info!(
        resolution = r,
        jobs = jobs.len(),
        symmetry = cfg.exploit_symmetry,
        "starting environment sweep"
    );

    let results: Vec<(GridCoord, f64)> = jobs
        .par_iter()
        .map(|&(n, f, coord)| {
            let score = evaluate_environment(cfg, n, f)?;
            Ok((coord, score))
        })
        .collect::<Result<_>>()?;

    let mut matrix = ScanMatrix::new(r);
    for (coord, score) in results {
        matrix
            .scatter(coord, score)
            .context("scattering environment result")?;
        if cfg.exploit_symmetry {
            let mirror = GridCoord {
                row: r - 1 - coord.col,
                col: r - 1 - coord.row,
            };
            if mirror != coord {
                matrix
                    .scatter(mirror, score)
                    .context("mirroring environment result")?;
            }
        }
    }
    let map = matrix.finish().context("assembling survivability map")?;
    info!(resolution = r, "environment sweep complete");
    Ok(map)
}
