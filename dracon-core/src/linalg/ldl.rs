//! Sparse LDL^T factorization of symmetric quasi-definite matrices.
//!
//! Thin wrapper over the `ldl` crate. The embedding matrix is constant
//! over a solve, so the factorization is computed once up front and only
//! triangular solves run in the iteration. D may carry negative entries;
//! tiny pivots are bumped to a signed floor to keep the backsolve stable.

use super::sparse::SparseCsc;
use thiserror::Error;

/// LDL factorization errors.
#[derive(Error, Debug)]
pub enum LdlError {
    /// Elimination tree construction rejected the pattern
    #[error("symbolic factorization failed: matrix pattern is not upper triangular")]
    SymbolicFailed,

    /// Numeric factorization broke down (zero pivot chain)
    #[error("numeric factorization failed: matrix not quasi-definite")]
    NumericFailed,

    /// Matrix is not square or does not match the declared dimension
    #[error("dimension mismatch: expected {expected}x{expected}, got {rows}x{cols}")]
    DimensionMismatch {
        /// Declared dimension
        expected: usize,
        /// Matrix rows
        rows: usize,
        /// Matrix cols
        cols: usize,
    },
}

const MIN_PIVOT: f64 = 1e-13;
const PIVOT_REPLACEMENT: f64 = 1e-7;

/// Factorized quasi-definite system, ready for repeated solves.
pub struct LdlFactorization {
    n: usize,
    l_p: Vec<usize>,
    l_i: Vec<usize>,
    l_x: Vec<f64>,
    d_inv: Vec<f64>,
    pivot_bumps: u64,
}

impl LdlFactorization {
    /// Factor an upper-triangle CSC matrix.
    ///
    /// The input must contain only entries with col >= row and must have
    /// an explicit entry on every diagonal position.
    pub fn new(mat: &SparseCsc) -> Result<Self, LdlError> {
        let n = mat.rows();
        if mat.cols() != n {
            return Err(LdlError::DimensionMismatch {
                expected: n,
                rows: mat.rows(),
                cols: mat.cols(),
            });
        }

        // Keep indptr alive for the raw pointer view
        let indptr = mat.indptr();
        let a_p = indptr.raw_storage();
        let a_i = mat.indices();
        let a_x = mat.data();

        let mut work = vec![0; n];
        let mut l_nz = vec![0; n];
        let mut etree = vec![None; n];
        ldl::etree(n, a_p, a_i, &mut work, &mut l_nz, &mut etree)
            .map_err(|_| LdlError::SymbolicFailed)?;

        let nnz_l: usize = l_nz.iter().sum();
        let mut l_p = vec![0; n + 1];
        let mut l_i = vec![0; nnz_l];
        let mut l_x = vec![0.0; nnz_l];
        let mut d = vec![0.0; n];
        let mut d_inv = vec![0.0; n];

        let mut bwork = vec![ldl::Marker::Unused; n];
        let mut iwork = vec![0; 3 * n];
        let mut fwork = vec![0.0; n];

        ldl::factor(
            n,
            a_p,
            a_i,
            a_x,
            &mut l_p,
            &mut l_i,
            &mut l_x,
            &mut d,
            &mut d_inv,
            &l_nz,
            &etree,
            &mut bwork,
            &mut iwork,
            &mut fwork,
        )
        .map_err(|_| LdlError::NumericFailed)?;

        // Bump near-zero pivots to a signed floor
        let mut pivot_bumps = 0;
        for i in 0..n {
            if d[i].abs() < MIN_PIVOT {
                let bumped = if d[i] >= 0.0 {
                    PIVOT_REPLACEMENT
                } else {
                    -PIVOT_REPLACEMENT
                };
                d_inv[i] = 1.0 / bumped;
                pivot_bumps += 1;
            }
        }

        Ok(Self {
            n,
            l_p,
            l_i,
            l_x,
            d_inv,
            pivot_bumps,
        })
    }

    /// System dimension.
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of pivots that hit the regularization floor during
    /// factorization.
    pub fn pivot_bumps(&self) -> u64 {
        self.pivot_bumps
    }

    /// Solve LDL^T x = b in place.
    pub fn solve_in_place(&self, x: &mut [f64]) {
        assert_eq!(x.len(), self.n);
        ldl::solve(self.n, &self.l_p, &self.l_i, &self.l_x, &self.d_inv, x);
    }
}
