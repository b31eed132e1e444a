//! Trajectory outcome classification.

use crate::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

/// Viability thresholds applied pointwise along a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Either metabolite at or below this level means starvation.
    pub starvation_floor: f64,
    /// Total metabolite concentration above this level means an
    /// osmotic crisis (bursting).
    pub osmotic_ceiling: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            starvation_floor: 0.1,
            osmotic_ceiling: 20.0,
        }
    }
}

/// The fate of one simulated protocell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Both metabolites stayed above the floor and the total stayed at
    /// or below the ceiling at every sampled time.
    Survive,
    /// The total concentration exceeded the ceiling at some time.
    OsmoticCrisis,
    /// A metabolite fell to or below the floor, without any ceiling
    /// breach.
    Starvation,
    /// The trajectory contains non-finite values (solver divergence or
    /// an undefined derivative); no fate can be assigned.
    Indeterminate,
}

impl Outcome {
    /// Numeric code used in the viability map: 0 survive, 1 crisis,
    /// -1 starvation, NaN indeterminate.
    pub fn label(self) -> f64 {
        match self {
            Outcome::Survive => 0.0,
            Outcome::OsmoticCrisis => 1.0,
            Outcome::Starvation => -1.0,
            Outcome::Indeterminate => f64::NAN,
        }
    }
}

/// Classifies a completed trajectory from its metabolite columns.
///
/// Precedence is fixed: non-finite data is indeterminate; otherwise a
/// ceiling breach (bursting, a transient event) takes priority over a
/// floor violation (decay, an asymptotic one); otherwise the cell
/// survives.
pub fn classify(traj: &Trajectory, a_col: usize, b_col: usize, thresholds: &Thresholds) -> Outcome {
    let mut ceiling_breached = false;
    let mut floor_violated = false;

    for row in 0..traj.rows() {
        let a = traj.value(row, a_col);
        let b = traj.value(row, b_col);
        if !a.is_finite() || !b.is_finite() {
            return Outcome::Indeterminate;
        }
        if a + b > thresholds.osmotic_ceiling {
            ceiling_breached = true;
        }
        if a <= thresholds.starvation_floor || b <= thresholds.starvation_floor {
            floor_violated = true;
        }
    }

    if ceiling_breached {
        Outcome::OsmoticCrisis
    } else if floor_violated {
        Outcome::Starvation
    } else {
        Outcome::Survive
    }
}

/// Collapses an outcome to the binary score used by the environment
/// sweep: 1.0 for survival, 0.0 for anything else (including
/// indeterminate trajectories, which cannot be counted as alive).
pub fn survival_score(outcome: Outcome) -> f64 {
    match outcome {
        Outcome::Survive => 1.0,
        _ => 0.0,
    }
}
