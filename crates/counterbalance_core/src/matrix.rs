//! The viability map: a square result matrix assembled from tagged
//! parallel results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer (row, column) index of one cell of the result matrix,
/// assigned when the evaluation grid is built and carried through
/// parallel dispatch so results can be scattered in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub row: usize,
    pub col: usize,
}

/// Scatter-phase failures. These are programming errors in grid
/// construction, never data-dependent, so the scan fails fast on them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("coordinate ({row}, {col}) outside {resolution}x{resolution} matrix")]
    CoordinateOutOfBounds {
        row: usize,
        col: usize,
        resolution: usize,
    },
    #[error("cell ({row}, {col}) written twice")]
    DuplicateWrite { row: usize, col: usize },
    #[error("{unwritten} of {total} cells never received a result")]
    IncompleteCoverage { unwritten: usize, total: usize },
}

/// A square matrix of outcome labels or survivability scores under
/// construction. Every cell must be written exactly once before the
/// finished map can be taken out.
#[derive(Debug, Clone)]
pub struct ScanMatrix {
    values: Vec<f64>,
    written: Vec<bool>,
    resolution: usize,
}

impl ScanMatrix {
    pub fn new(resolution: usize) -> Self {
        Self {
            values: vec![0.0; resolution * resolution],
            written: vec![false; resolution * resolution],
            resolution,
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Writes one result into its cell.
    pub fn scatter(&mut self, coord: GridCoord, value: f64) -> Result<(), ScanError> {
        if coord.row >= self.resolution || coord.col >= self.resolution {
            return Err(ScanError::CoordinateOutOfBounds {
                row: coord.row,
                col: coord.col,
                resolution: self.resolution,
            });
        }
        let idx = coord.row * self.resolution + coord.col;
        if self.written[idx] {
            return Err(ScanError::DuplicateWrite {
                row: coord.row,
                col: coord.col,
            });
        }
        self.written[idx] = true;
        self.values[idx] = value;
        Ok(())
    }

    /// Verifies full coverage and releases the finished map.
    pub fn finish(self) -> Result<ViabilityMap, ScanError> {
        let unwritten = self.written.iter().filter(|w| !**w).count();
        if unwritten > 0 {
            return Err(ScanError::IncompleteCoverage {
                unwritten,
                total: self.written.len(),
            });
        }
        Ok(ViabilityMap {
            values: self.values,
            resolution: self.resolution,
        })
    }
}

/// A completed viability map. Read-only from here on; plotting and
/// persistence consume it as a plain grid of floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViabilityMap {
    values: Vec<f64>,
    resolution: usize,
}

impl ViabilityMap {
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.resolution + col]
    }

    /// Row-major cell values.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Maps a column index back to the physical value of the swept
    /// x-axis quantity over `[lo, hi]`.
    pub fn x_axis_value(&self, col: usize, lo: f64, hi: f64) -> f64 {
        axis_value(col, self.resolution, lo, hi)
    }

    /// Maps a row index back to the physical value of the swept y-axis
    /// quantity. Rows run top-down while the quantity increases upward,
    /// so the axis is reversed.
    pub fn y_axis_value(&self, row: usize, lo: f64, hi: f64) -> f64 {
        axis_value(self.resolution - 1 - row, self.resolution, lo, hi)
    }
}

fn axis_value(index: usize, resolution: usize, lo: f64, hi: f64) -> f64 {
    if resolution < 2 {
        return lo;
    }
    lo + (hi - lo) * index as f64 / (resolution - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::{GridCoord, ScanError, ScanMatrix};

    #[test]
    fn scatter_then_finish_round_trips_values() {
        let mut matrix = ScanMatrix::new(2);
        matrix.scatter(GridCoord { row: 0, col: 0 }, 1.0).unwrap();
        matrix.scatter(GridCoord { row: 0, col: 1 }, -1.0).unwrap();
        matrix.scatter(GridCoord { row: 1, col: 0 }, 0.0).unwrap();
        matrix.scatter(GridCoord { row: 1, col: 1 }, 0.5).unwrap();
        let map = matrix.finish().unwrap();
        assert_eq!(map.value(0, 0), 1.0);
        assert_eq!(map.value(0, 1), -1.0);
        assert_eq!(map.value(1, 0), 0.0);
        assert_eq!(map.value(1, 1), 0.5);
    }

    #[test]
    fn out_of_bounds_coordinate_is_fatal() {
        let mut matrix = ScanMatrix::new(2);
        let err = matrix
            .scatter(GridCoord { row: 2, col: 0 }, 0.0)
            .unwrap_err();
        assert_eq!(
            err,
            ScanError::CoordinateOutOfBounds {
                row: 2,
                col: 0,
                resolution: 2
            }
        );
    }

    #[test]
    fn double_write_is_fatal() {
        let mut matrix = ScanMatrix::new(2);
        matrix.scatter(GridCoord { row: 1, col: 1 }, 0.0).unwrap();
        let err = matrix
            .scatter(GridCoord { row: 1, col: 1 }, 0.0)
            .unwrap_err();
        assert_eq!(err, ScanError::DuplicateWrite { row: 1, col: 1 });
    }

    #[test]
    fn finish_rejects_unwritten_cells() {
        let mut matrix = ScanMatrix::new(2);
        matrix.scatter(GridCoord { row: 0, col: 0 }, 0.0).unwrap();
        let err = matrix.finish().unwrap_err();
        assert_eq!(
            err,
            ScanError::IncompleteCoverage {
                unwritten: 3,
                total: 4
            }
        );
    }

    #[test]
    fn axis_mapping_recovers_physical_units() {
        let mut matrix = ScanMatrix::new(5);
        for row in 0..5 {
            for col in 0..5 {
                matrix.scatter(GridCoord { row, col }, 0.0).unwrap();
            }
        }
        let map = matrix.finish().unwrap();
        assert_eq!(map.x_axis_value(0, 0.0, 20.0), 0.0);
        assert_eq!(map.x_axis_value(4, 0.0, 20.0), 20.0);
        assert_eq!(map.x_axis_value(2, 0.0, 20.0), 10.0);
        // y axis is flipped: row 0 is the top of the plot.
        assert_eq!(map.y_axis_value(0, 0.0, 20.0), 20.0);
        assert_eq!(map.y_axis_value(4, 0.0, 20.0), 0.0);
    }
}
