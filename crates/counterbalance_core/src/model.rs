//! The protocell model: parameter set, rectified resource supplies, and
//! the two vector-field variants (behaving 4-state, fixed-environment
//! 2-state) from McShaffrey & Beer's counterbalance system.

use crate::traits::VectorField;
use serde::{Deserialize, Serialize};

/// State layout of [`BehavingProtocell`].
pub const LOCATION: usize = 0;
/// Metabolite A concentration.
pub const MET_A: usize = 1;
/// Metabolite B concentration.
pub const MET_B: usize = 2;
/// Behavioral activation variable.
pub const ACTIVATION: usize = 3;

/// State layout of [`FixedEnvironment`].
pub const FIXED_MET_A: usize = 0;
/// Metabolite B concentration in the reduced model.
pub const FIXED_MET_B: usize = 1;

/// Named constants governing the protocell vector field.
///
/// One instance is fixed at the start of a scan and shared read-only by
/// every worker. Defaults are the published paper values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtocellParams {
    /// Gain on the behavioral relaxation term.
    pub alpha: f64,
    /// Metabolite production rate.
    pub gamma: f64,
    /// First-order metabolite decay rate.
    pub decay: f64,
    /// Half-saturation constant of the metabolic Hill terms.
    pub k1: f64,
    /// Cooperativity exponent of the metabolic Hill terms.
    pub hill_n: f64,
    /// Hill exponent of the behavioral switch (steep).
    pub hill_h: f64,
    /// Half-saturation constant of the behavioral switch.
    pub k2: f64,
    /// Resource-gradient intercept.
    pub supply_intercept: f64,
    /// Resource-gradient slope.
    pub supply_slope: f64,
    /// Movement velocity scale.
    pub velocity: f64,
}

impl Default for ProtocellParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            gamma: 0.04,
            decay: 0.05,
            k1: 4.0,
            hill_n: 3.0,
            hill_h: 20.0,
            k2: 0.5,
            supply_intercept: 9.0,
            supply_slope: 4.0,
            velocity: 2.0,
        }
    }
}

/// Amount of the rising resource available at `location`: the linear
/// gradient `slope * location + intercept`, clamped at zero so the
/// supply can never go negative.
pub fn supply_rising(location: f64, slope: f64, intercept: f64) -> f64 {
    (slope * location + intercept).max(0.0)
}

/// Amount of the falling resource available at `location`:
/// `-slope * location + intercept`, clamped at zero.
pub fn supply_falling(location: f64, slope: f64, intercept: f64) -> f64 {
    (-slope * location + intercept).max(0.0)
}

fn hill(x: f64, k: f64, n: f64) -> f64 {
    let xn = x.powf(n);
    xn / (k.powf(n) + xn)
}

/// The full behaving protocell: location, two metabolites, and the
/// behavioral activation that drives directed movement.
///
/// The cross-activation structure is symmetric: B catalyzes production
/// of A from the rising resource, A catalyzes production of B from the
/// falling resource, and the activation relaxes toward a steep sigmoid
/// of the normalized metabolite imbalance. When A + B = 0 that sigmoid
/// is undefined and the derivative goes non-finite; this is not guarded
/// here and surfaces downstream as an indeterminate outcome.
#[derive(Debug, Clone, Copy)]
pub struct BehavingProtocell {
    pub params: ProtocellParams,
}

impl BehavingProtocell {
    pub fn new(params: ProtocellParams) -> Self {
        Self { params }
    }
}

impl VectorField<f64> for BehavingProtocell {
    fn dimension(&self) -> usize {
        4
    }

    fn eval(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let p = &self.params;
        let l = x[LOCATION];
        let a = x[MET_A];
        let b = x[MET_B];
        let act = x[ACTIVATION];

        // Normalized imbalance (A - B)/(A + B) rescaled from [-1, 1] to [0, 1].
        let imbalance = (((a - b) / (a + b)) + 1.0) / 2.0;
        let k2h = p.k2.powf(p.hill_h);

        out[LOCATION] = (act - 0.5) * p.velocity;
        out[MET_A] = p.gamma * hill(b, p.k1, p.hill_n)
            * supply_rising(l, p.supply_slope, p.supply_intercept)
            - p.decay * a;
        out[MET_B] = p.gamma * hill(a, p.k1, p.hill_n)
            * supply_falling(l, p.supply_slope, p.supply_intercept)
            - p.decay * b;
        out[ACTIVATION] = p.alpha * (k2h / (imbalance.powf(p.hill_h) + k2h)) - act;
    }
}

/// The reduced metabolic model: no location, no behavior, resource
/// levels `n_supply` and `f_supply` held constant by the environment.
#[derive(Debug, Clone, Copy)]
pub struct FixedEnvironment {
    pub params: ProtocellParams,
    /// Fixed concentration of the resource that feeds metabolite A.
    pub n_supply: f64,
    /// Fixed concentration of the resource that feeds metabolite B.
    pub f_supply: f64,
}

impl FixedEnvironment {
    pub fn new(params: ProtocellParams, n_supply: f64, f_supply: f64) -> Self {
        Self {
            params,
            n_supply,
            f_supply,
        }
    }
}

impl VectorField<f64> for FixedEnvironment {
    fn dimension(&self) -> usize {
        2
    }

    fn eval(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let p = &self.params;
        let a = x[FIXED_MET_A];
        let b = x[FIXED_MET_B];

        out[FIXED_MET_A] = p.gamma * hill(b, p.k1, p.hill_n) * self.n_supply - p.decay * a;
        out[FIXED_MET_B] = p.gamma * hill(a, p.k1, p.hill_n) * self.f_supply - p.decay * b;
    }
}
