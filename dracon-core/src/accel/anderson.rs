//! Anderson acceleration (type II) directions.
//!
//! Solves the small least-squares problem min_γ ||R - Y γ||₂ over the
//! stored residual differences Y and extrapolates
//!
//! ```text
//! d = -(R + (S - Y) γ)
//! ```
//!
//! so that w + d is the Anderson mixing of the stored iterates. The
//! least-squares solve goes through an SVD with a relative rank cutoff;
//! a rank-deficient history reports ill-conditioning instead of
//! producing a garbage direction.

use super::broyden::DirectionFailure;
use super::memory::DirectionMemory;
use nalgebra::{DMatrix, DVector};

const RANK_TOL: f64 = 1e-12;

/// Anderson direction builder.
#[derive(Debug, Default)]
pub struct AndersonDirection {}

impl AndersonDirection {
    /// Create a builder.
    pub fn new() -> Self {
        Self {}
    }

    /// Compute the extrapolated direction into `out`.
    pub fn compute(
        &mut self,
        memory: &DirectionMemory,
        residual: &[f64],
        out: &mut [f64],
    ) -> Result<(), DirectionFailure> {
        if memory.is_empty() {
            return Err(DirectionFailure::EmptyMemory);
        }

        let n = residual.len();
        let m = memory.len();
        let mut ymat = DMatrix::<f64>::zeros(n, m);
        for (j, pair) in memory.iter().enumerate() {
            for (i, &v) in pair.dr.iter().enumerate() {
                ymat[(i, j)] = v;
            }
        }
        let rk = DVector::from_column_slice(residual);

        let svd = ymat.svd(true, true);
        let s_max = svd
            .singular_values
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        if s_max <= 0.0 || !s_max.is_finite() {
            return Err(DirectionFailure::IllConditioned);
        }
        let gamma = svd
            .solve(&rk, RANK_TOL * s_max)
            .map_err(|_| DirectionFailure::IllConditioned)?;

        for (o, &ri) in out.iter_mut().zip(residual.iter()) {
            *o = -ri;
        }
        for (j, pair) in memory.iter().enumerate() {
            let coeff = gamma[j];
            for (i, o) in out.iter_mut().enumerate() {
                *o += coeff * (pair.dr[i] - pair.dw[i]);
            }
        }

        if out.iter().any(|v| !v.is_finite()) {
            return Err(DirectionFailure::IllConditioned);
        }
        Ok(())
    }
}
