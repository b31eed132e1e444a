//! Adaptive trajectory integration.
//!
//! The viability model mixes fast sigmoidal switching with slow decay,
//! so the integrator uses an embedded Dormand-Prince 5(4) pair with
//! error-based step control and synchronizes its output to the caller's
//! time grid by clamping steps onto each requested output time.

use crate::traits::{Scalar, VectorField};
use crate::trajectory::Trajectory;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Absolute and relative error tolerances for step control.
///
/// The defaults are fixed deliberately: the classifier thresholds
/// (0.1 and 20.0) sit far above 1e-6, so accepted local error cannot
/// flip an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub abs_tol: f64,
    pub rel_tol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs_tol: 1e-8,
            rel_tol: 1e-6,
        }
    }
}

/// Dormand-Prince 5(4) embedded Runge-Kutta stepper.
pub struct DormandPrince54<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    k5: Vec<T>,
    k6: Vec<T>,
    k7: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> DormandPrince54<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::from_f64(0.0).unwrap();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            k5: vec![z; dim],
            k6: vec![z; dim],
            k7: vec![z; dim],
            tmp: vec![z; dim],
        }
    }

    /// Attempts one step of size `dt` from (`t`, `state`), writing the
    /// 5th-order candidate into `candidate` and returning the scaled
    /// error norm of the embedded 4th-order difference. A norm <= 1
    /// means the step meets tolerance.
    pub fn try_step(
        &mut self,
        field: &impl VectorField<T>,
        t: T,
        state: &[T],
        dt: T,
        candidate: &mut [T],
        tol: &Tolerances,
    ) -> T {
        let t0 = t;

        // Dormand-Prince Coefficients
        let c2 = T::from_f64(1.0 / 5.0).unwrap();
        let c3 = T::from_f64(3.0 / 10.0).unwrap();
        let c4 = T::from_f64(4.0 / 5.0).unwrap();
        let c5 = T::from_f64(8.0 / 9.0).unwrap();

        let a21 = T::from_f64(1.0 / 5.0).unwrap();

        let a31 = T::from_f64(3.0 / 40.0).unwrap();
        let a32 = T::from_f64(9.0 / 40.0).unwrap();

        let a41 = T::from_f64(44.0 / 45.0).unwrap();
        let a42 = T::from_f64(-56.0 / 15.0).unwrap();
        let a43 = T::from_f64(32.0 / 9.0).unwrap();

        let a51 = T::from_f64(19372.0 / 6561.0).unwrap();
        let a52 = T::from_f64(-25360.0 / 2187.0).unwrap();
        let a53 = T::from_f64(64448.0 / 6561.0).unwrap();
        let a54 = T::from_f64(-212.0 / 729.0).unwrap();

        let a61 = T::from_f64(9017.0 / 3168.0).unwrap();
        let a62 = T::from_f64(-355.0 / 33.0).unwrap();
        let a63 = T::from_f64(46732.0 / 5247.0).unwrap();
        let a64 = T::from_f64(49.0 / 176.0).unwrap();
        let a65 = T::from_f64(-5103.0 / 18656.0).unwrap();

        // b coefficients (5th order solution; b2 = b7 = 0)
        let b1 = T::from_f64(35.0 / 384.0).unwrap();
        let b3 = T::from_f64(500.0 / 1113.0).unwrap();
        let b4 = T::from_f64(125.0 / 192.0).unwrap();
        let b5 = T::from_f64(-2187.0 / 6784.0).unwrap();
        let b6 = T::from_f64(11.0 / 84.0).unwrap();

        // e coefficients (5th minus embedded 4th order)
        let e1 = T::from_f64(71.0 / 57600.0).unwrap();
        let e3 = T::from_f64(-71.0 / 16695.0).unwrap();
        let e4 = T::from_f64(71.0 / 1920.0).unwrap();
        let e5 = T::from_f64(-17253.0 / 339200.0).unwrap();
        let e6 = T::from_f64(22.0 / 525.0).unwrap();
        let e7 = T::from_f64(-1.0 / 40.0).unwrap();

        // k1
        field.eval(t0, state, &mut self.k1);

        // k2
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * (a21 * self.k1[i]);
        }
        field.eval(t0 + c2 * dt, &self.tmp, &mut self.k2);

        // k3
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * (a31 * self.k1[i] + a32 * self.k2[i]);
        }
        field.eval(t0 + c3 * dt, &self.tmp, &mut self.k3);

        // k4
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * (a41 * self.k1[i] + a42 * self.k2[i] + a43 * self.k3[i]);
        }
        field.eval(t0 + c4 * dt, &self.tmp, &mut self.k4);

        // k5
        for i in 0..state.len() {
            self.tmp[i] = state[i]
                + dt * (a51 * self.k1[i] + a52 * self.k2[i] + a53 * self.k3[i] + a54 * self.k4[i]);
        }
        field.eval(t0 + c5 * dt, &self.tmp, &mut self.k5);

        // k6
        for i in 0..state.len() {
            self.tmp[i] = state[i]
                + dt * (a61 * self.k1[i]
                    + a62 * self.k2[i]
                    + a63 * self.k3[i]
                    + a64 * self.k4[i]
                    + a65 * self.k5[i]);
        }
        field.eval(t0 + dt, &self.tmp, &mut self.k6);

        // 5th order candidate
        for i in 0..state.len() {
            candidate[i] = state[i]
                + dt * (b1 * self.k1[i]
                    + b3 * self.k3[i]
                    + b4 * self.k4[i]
                    + b5 * self.k5[i]
                    + b6 * self.k6[i]);
        }

        // k7 = f(t + dt, candidate), used only in the error estimate
        field.eval(t0 + dt, candidate, &mut self.k7);

        // Scaled RMS norm of the embedded error
        let zero = T::from_f64(0.0).unwrap();
        let atol = T::from_f64(tol.abs_tol).unwrap();
        let rtol = T::from_f64(tol.rel_tol).unwrap();
        let mut accum = zero;
        for i in 0..state.len() {
            let err = dt
                * (e1 * self.k1[i]
                    + e3 * self.k3[i]
                    + e4 * self.k4[i]
                    + e5 * self.k5[i]
                    + e6 * self.k6[i]
                    + e7 * self.k7[i]);
            let scale = atol + rtol * state[i].abs().max(candidate[i].abs());
            let ratio = err / scale;
            accum = accum + ratio * ratio;
        }
        let n = T::from_f64(state.len() as f64).unwrap();
        (accum / n).sqrt()
    }
}

const SAFETY: f64 = 0.9;
const MIN_SHRINK: f64 = 0.2;
const MAX_GROW: f64 = 5.0;
const MAX_STEPS: usize = 10_000_000;

/// Integrates `field` from `x0` across `times`, returning one trajectory
/// row per requested time point. The first row is `x0` itself.
///
/// Steps are clamped so every output time is hit exactly; no dense-output
/// interpolation is needed. If the state goes non-finite or the step
/// size underflows, integration stops and all remaining rows are filled
/// with NaN so the divergence stays visible to the classifier.
pub fn integrate(
    field: &impl VectorField<f64>,
    x0: &[f64],
    times: &[f64],
    tol: Tolerances,
) -> Result<Trajectory> {
    let dim = field.dimension();
    if dim == 0 {
        bail!("Vector field dimension must be positive.");
    }
    if x0.len() != dim {
        bail!(
            "Initial state dimension mismatch. Expected {}, got {}.",
            dim,
            x0.len()
        );
    }
    if times.len() < 2 {
        bail!("Time grid needs at least two points.");
    }
    if times.iter().any(|t| !t.is_finite()) {
        bail!("Time grid must be finite.");
    }
    if times.windows(2).any(|w| w[1] <= w[0]) {
        bail!("Time grid must be strictly increasing.");
    }
    if tol.abs_tol <= 0.0 || tol.rel_tol <= 0.0 {
        bail!("Tolerances must be positive.");
    }

    let mut traj = Trajectory::zeroed(times.len(), dim);
    traj.set_row(0, x0);

    let mut stepper = DormandPrince54::new(dim);
    let mut state = x0.to_vec();
    let mut candidate = vec![0.0; dim];
    let mut t = times[0];
    // Initial step guess: a small fraction of the first output interval.
    let mut dt = (times[1] - times[0]) / 16.0;
    let mut steps = 0usize;

    for row in 1..times.len() {
        let target = times[row];
        loop {
            if state.iter().all(|v| v.is_finite()) && (target - t) <= f64::EPSILON * target.abs() {
                break;
            }
            let clamped = dt.min(target - t);
            let err = stepper.try_step(field, t, &state, clamped, &mut candidate, &tol);
            steps += 1;

            if !err.is_finite() || steps > MAX_STEPS || dt < f64::EPSILON * t.abs().max(1.0) {
                // Divergence or stall: mark everything from here on.
                for r in row..times.len() {
                    traj.fill_row(r, f64::NAN);
                }
                return Ok(traj);
            }

            if err <= 1.0 {
                t += clamped;
                state.copy_from_slice(&candidate);
                let grow = if err == 0.0 {
                    MAX_GROW
                } else {
                    (SAFETY * err.powf(-0.2)).min(MAX_GROW)
                };
                dt *= grow.max(MIN_SHRINK);
            } else {
                dt = clamped * (SAFETY * err.powf(-0.2)).clamp(MIN_SHRINK, 1.0);
            }
        }
        traj.set_row(row, &state);
    }

    Ok(traj)
}

/// Builds the `samples`-point uniform time grid `[0, horizon]` used by
/// the sweeps.
pub fn uniform_times(horizon: f64, samples: usize) -> Vec<f64> {
    let step = horizon / (samples.saturating_sub(1)).max(1) as f64;
    (0..samples).map(|i| i as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use super::{integrate, uniform_times, Tolerances};
    use crate::traits::VectorField;

    struct Decay {
        rate: f64,
    }

    impl VectorField<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn eval(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -self.rate * x[0];
        }
    }

    struct Blowup;

    impl VectorField<f64> for Blowup {
        fn dimension(&self) -> usize {
            1
        }

        fn eval(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            // dx/dt = x^2 with x(0) = 1 blows up at t = 1.
            out[0] = x[0] * x[0];
        }
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn rejects_malformed_inputs() {
        let field = Decay { rate: 1.0 };
        assert_err_contains(
            integrate(&field, &[1.0, 2.0], &[0.0, 1.0], Tolerances::default()),
            "dimension mismatch",
        );
        assert_err_contains(
            integrate(&field, &[1.0], &[0.0], Tolerances::default()),
            "at least two points",
        );
        assert_err_contains(
            integrate(&field, &[1.0], &[0.0, 1.0, 0.5], Tolerances::default()),
            "strictly increasing",
        );
        assert_err_contains(
            integrate(&field, &[1.0], &[0.0, f64::NAN], Tolerances::default()),
            "finite",
        );
        assert_err_contains(
            integrate(
                &field,
                &[1.0],
                &[0.0, 1.0],
                Tolerances {
                    abs_tol: 0.0,
                    rel_tol: 1e-6,
                },
            ),
            "Tolerances",
        );
    }

    #[test]
    fn returns_one_row_per_time_point_starting_at_x0() {
        let field = Decay { rate: 0.3 };
        let times = uniform_times(10.0, 21);
        let traj = integrate(&field, &[2.0], &times, Tolerances::default()).unwrap();
        assert_eq!(traj.rows(), 21);
        assert_eq!(traj.dim(), 1);
        assert_eq!(traj.value(0, 0), 2.0);
    }

    #[test]
    fn matches_exponential_decay_within_tolerance() {
        let field = Decay { rate: 1.0 };
        let times = uniform_times(5.0, 51);
        let traj = integrate(&field, &[1.0], &times, Tolerances::default()).unwrap();
        for (i, t) in times.iter().enumerate() {
            let exact = (-t).exp();
            assert!(
                (traj.value(i, 0) - exact).abs() < 1e-5,
                "row {i}: {} vs {exact}",
                traj.value(i, 0)
            );
        }
    }

    #[test]
    fn divergence_fills_remaining_rows_with_nan() {
        let times = uniform_times(2.0, 41);
        let traj = integrate(&Blowup, &[1.0], &times, Tolerances::default()).unwrap();
        assert_eq!(traj.rows(), 41);
        assert!(traj.value(0, 0) == 1.0);
        // The solution exists on [0, 1) and blows up before t = 2.
        let last = traj.value(40, 0);
        assert!(last.is_nan(), "expected NaN tail, got {last}");
        // NaN rows are a contiguous suffix.
        let mut seen_nan = false;
        for v in traj.column_iter(0) {
            if v.is_nan() {
                seen_nan = true;
            } else {
                assert!(!seen_nan, "finite value after NaN tail began");
            }
        }
    }

    #[test]
    fn nan_initial_derivative_is_marked_from_the_second_row() {
        struct Undefined;
        impl VectorField<f64> for Undefined {
            fn dimension(&self) -> usize {
                1
            }
            fn eval(&self, _t: f64, _x: &[f64], out: &mut [f64]) {
                out[0] = f64::NAN;
            }
        }
        let traj = integrate(&Undefined, &[1.0], &[0.0, 1.0, 2.0], Tolerances::default()).unwrap();
        assert_eq!(traj.value(0, 0), 1.0);
        assert!(traj.value(1, 0).is_nan());
        assert!(traj.value(2, 0).is_nan());
    }

    #[test]
    fn uniform_times_spans_the_horizon() {
        let times = uniform_times(800.0, 2000);
        assert_eq!(times.len(), 2000);
        assert_eq!(times[0], 0.0);
        assert!((times[1999] - 800.0).abs() < 1e-9);
        assert!(times.windows(2).all(|w| w[1] > w[0]));
    }
}
