/// The `counterbalance_core` crate computes protocell viability maps:
/// for a grid of starting conditions (or fixed environments) it
/// integrates the counterbalance model forward in time, classifies each
/// trajectory's fate, and assembles the labels into a 2D matrix.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `VectorField` (the ODE seam).
/// - **Model**: the behaving 4-state protocell and the reduced fixed-environment variant.
/// - **Solver**: Dormand-Prince 5(4) adaptive integration onto a fixed output grid.
/// - **Classify**: the survive / osmotic-crisis / starvation / indeterminate rule.
/// - **Sweep**: the parallel grid-scan orchestrators producing `ViabilityMap`s.
pub mod traits;

pub mod classify;
pub mod matrix;
pub mod model;
pub mod solver;
pub mod sweep;
pub mod trajectory;
