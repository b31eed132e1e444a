//! Integrator output: a dense record of one simulated trajectory.

/// A `rows x dim` record of a state trajectory, row-major, one row per
/// requested output time. Built by the integrator and consumed once by
/// the classifier, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    data: Vec<f64>,
    rows: usize,
    dim: usize,
}

impl Trajectory {
    pub(crate) fn zeroed(rows: usize, dim: usize) -> Self {
        Self {
            data: vec![0.0; rows * dim],
            rows,
            dim,
        }
    }

    /// Number of recorded time points.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Dimension of the state space.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// State component `col` at time index `row`.
    pub fn value(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows && col < self.dim);
        self.data[row * self.dim + col]
    }

    /// The full state at time index `row`.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.dim..(row + 1) * self.dim]
    }

    /// Iterates one state component across all time points.
    pub fn column_iter(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        debug_assert!(col < self.dim);
        (0..self.rows).map(move |r| self.data[r * self.dim + col])
    }

    pub(crate) fn set_row(&mut self, row: usize, state: &[f64]) {
        self.data[row * self.dim..(row + 1) * self.dim].copy_from_slice(state);
    }

    pub(crate) fn fill_row(&mut self, row: usize, value: f64) {
        self.data[row * self.dim..(row + 1) * self.dim].fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::Trajectory;

    #[test]
    fn rows_and_columns_index_the_same_storage() {
        let mut traj = Trajectory::zeroed(3, 2);
        traj.set_row(0, &[1.0, 2.0]);
        traj.set_row(1, &[3.0, 4.0]);
        traj.set_row(2, &[5.0, 6.0]);

        assert_eq!(traj.rows(), 3);
        assert_eq!(traj.dim(), 2);
        assert_eq!(traj.row(1), &[3.0, 4.0]);
        assert_eq!(traj.value(2, 0), 5.0);
        let second: Vec<f64> = traj.column_iter(1).collect();
        assert_eq!(second, vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn fill_row_overwrites_every_component() {
        let mut traj = Trajectory::zeroed(2, 4);
        traj.fill_row(1, f64::NAN);
        assert!(traj.row(0).iter().all(|v| *v == 0.0));
        assert!(traj.row(1).iter().all(|v| v.is_nan()));
    }
}
