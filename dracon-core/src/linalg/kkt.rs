//! Embedding linear system solvers.
//!
//! Every iteration of the splitting applies (I + Q)^{-1}, which reduces
//! (after a Schur complement on the scale variable, handled by the
//! operator) to solving
//!
//! ```text
//! [ I   A^T ] [x]   [h1]
//! [ -A  I   ] [y] = [h2]
//! ```
//!
//! for fixed A. Two interchangeable backends solve it:
//!
//! - direct: factor the symmetric quasi-definite form
//!   `[[I, A^T], [A, -I]] (x, y) = (h1, -h2)` once with sparse LDL^T and
//!   backsolve per iteration;
//! - indirect: eliminate y and run conjugate gradient on the SPD normal
//!   system `(I + A^T A) x = h1 - A^T h2`, then recover `y = h2 + A x`,
//!   warm-starting CG from the previous solution.

use super::cg::{CgError, CgSolver};
use super::ldl::{LdlError, LdlFactorization};
use super::sparse::{self, SparseCsc};
use thiserror::Error;

/// Embedding solve errors.
#[derive(Error, Debug)]
pub enum KktError {
    /// Direct factorization failed
    #[error(transparent)]
    Ldl(#[from] LdlError),

    /// Indirect solve failed
    #[error(transparent)]
    Cg(#[from] CgError),
}

/// Solver for the fixed embedding system.
///
/// `h1` has length n, `h2` length m; outputs `x` (n) and `y` (m).
pub trait KktSolver {
    /// Solve `x + A^T y = h1`, `-A x + y = h2`.
    fn solve_kkt(
        &mut self,
        h1: &[f64],
        h2: &[f64],
        x: &mut [f64],
        y: &mut [f64],
    ) -> Result<(), KktError>;
}

/// Direct backend: one sparse LDL^T factorization, triangular solves
/// thereafter.
pub struct DirectKkt {
    factor: LdlFactorization,
    n: usize,
    m: usize,
    rhs: Vec<f64>,
}

impl DirectKkt {
    /// Assemble and factor the quasi-definite embedding matrix.
    ///
    /// `static_reg` is applied with matching sign: +reg on the identity
    /// block, -reg on the negated one, preserving quasi-definiteness.
    pub fn new(a: &SparseCsc, static_reg: f64) -> Result<Self, KktError> {
        let m = a.rows();
        let n = a.cols();

        let mut triplets = Vec::with_capacity(n + m + a.nnz());
        for i in 0..n {
            triplets.push((i, i, 1.0 + static_reg));
        }
        // A^T block occupies the strict upper triangle: entry (c, n + r)
        for (val, (row, col)) in a.iter() {
            triplets.push((col, n + row, *val));
        }
        for j in 0..m {
            triplets.push((n + j, n + j, -1.0 - static_reg));
        }

        let mat = sparse::from_triplets_symmetric(n + m, triplets);
        let factor = LdlFactorization::new(&mat)?;
        Ok(Self {
            factor,
            n,
            m,
            rhs: vec![0.0; n + m],
        })
    }

    /// Pivot bumps reported by the factorization.
    pub fn pivot_bumps(&self) -> u64 {
        self.factor.pivot_bumps()
    }
}

impl KktSolver for DirectKkt {
    fn solve_kkt(
        &mut self,
        h1: &[f64],
        h2: &[f64],
        x: &mut [f64],
        y: &mut [f64],
    ) -> Result<(), KktError> {
        assert_eq!(h1.len(), self.n);
        assert_eq!(h2.len(), self.m);

        self.rhs[..self.n].copy_from_slice(h1);
        for (r, &h) in self.rhs[self.n..].iter_mut().zip(h2.iter()) {
            *r = -h;
        }
        self.factor.solve_in_place(&mut self.rhs);

        x.copy_from_slice(&self.rhs[..self.n]);
        y.copy_from_slice(&self.rhs[self.n..]);
        Ok(())
    }
}

/// Indirect backend: CG on the normal equations, matrix-free.
pub struct IndirectKkt {
    a: SparseCsc,
    cg: CgSolver,
    x_prev: Vec<f64>,
    rhs: Vec<f64>,
    scratch_m: Vec<f64>,
}

impl IndirectKkt {
    /// Create the CG-based backend over the constraint matrix.
    pub fn new(a: SparseCsc, cg_tol: f64, cg_max_iters: usize) -> Self {
        let (m, n) = (a.rows(), a.cols());
        Self {
            a,
            cg: CgSolver::new(n, cg_tol, cg_max_iters),
            x_prev: vec![0.0; n],
            rhs: vec![0.0; n],
            scratch_m: vec![0.0; m],
        }
    }
}

impl KktSolver for IndirectKkt {
    fn solve_kkt(
        &mut self,
        h1: &[f64],
        h2: &[f64],
        x: &mut [f64],
        y: &mut [f64],
    ) -> Result<(), KktError> {
        let Self {
            a,
            cg,
            x_prev,
            rhs,
            scratch_m,
        } = self;
        assert_eq!(h1.len(), a.cols());
        assert_eq!(h2.len(), a.rows());

        // rhs = h1 - A^T h2
        rhs.copy_from_slice(h1);
        sparse::spmv_transpose(a, h2, rhs, -1.0, 1.0);

        // (I + A^T A) x = rhs, warm-started from the previous solution
        x.copy_from_slice(x_prev);
        cg.solve(
            |v: &[f64], out: &mut [f64]| {
                sparse::spmv(a, v, scratch_m, 1.0, 0.0);
                out.copy_from_slice(v);
                sparse::spmv_transpose(a, scratch_m, out, 1.0, 1.0);
            },
            rhs,
            x,
        )?;
        x_prev.copy_from_slice(x);

        // y = h2 + A x
        y.copy_from_slice(h2);
        sparse::spmv(a, x, scratch_m, 1.0, 0.0);
        sparse::axpy(1.0, scratch_m, y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::sparse::from_triplets;
    use approx::assert_relative_eq;

    fn sample_matrix() -> SparseCsc {
        // A = [[1, 2], [0, 3], [1, -1]]
        from_triplets(
            3,
            2,
            vec![(0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0), (2, 0, 1.0), (2, 1, -1.0)],
        )
    }

    fn check_solution(a: &SparseCsc, h1: &[f64], h2: &[f64], x: &[f64], y: &[f64], tol: f64) {
        // x + A^T y = h1
        let mut r1 = x.to_vec();
        sparse::spmv_transpose(a, y, &mut r1, 1.0, 1.0);
        for (ri, &hi) in r1.iter().zip(h1.iter()) {
            assert_relative_eq!(*ri, hi, epsilon = tol);
        }
        // -A x + y = h2
        let mut r2 = y.to_vec();
        sparse::spmv(a, x, &mut r2, -1.0, 1.0);
        for (ri, &hi) in r2.iter().zip(h2.iter()) {
            assert_relative_eq!(*ri, hi, epsilon = tol);
        }
    }

    #[test]
    fn test_direct_solves_embedding_system() {
        let a = sample_matrix();
        let mut solver = DirectKkt::new(&a, 0.0).unwrap();

        let h1 = vec![1.0, -2.0];
        let h2 = vec![0.5, 1.0, -1.5];
        let mut x = vec![0.0; 2];
        let mut y = vec![0.0; 3];
        solver.solve_kkt(&h1, &h2, &mut x, &mut y).unwrap();
        check_solution(&a, &h1, &h2, &x, &y, 1e-10);
    }

    #[test]
    fn test_indirect_matches_direct() {
        let a = sample_matrix();
        let mut direct = DirectKkt::new(&a, 0.0).unwrap();
        let mut indirect = IndirectKkt::new(a.clone(), 1e-12, 200);

        let h1 = vec![0.3, 0.7];
        let h2 = vec![-1.0, 0.2, 2.0];
        let (mut xd, mut yd) = (vec![0.0; 2], vec![0.0; 3]);
        let (mut xi, mut yi) = (vec![0.0; 2], vec![0.0; 3]);
        direct.solve_kkt(&h1, &h2, &mut xd, &mut yd).unwrap();
        indirect.solve_kkt(&h1, &h2, &mut xi, &mut yi).unwrap();

        for (d, i) in xd.iter().zip(xi.iter()) {
            assert_relative_eq!(d, i, epsilon = 1e-8);
        }
        for (d, i) in yd.iter().zip(yi.iter()) {
            assert_relative_eq!(d, i, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_indirect_warm_start_repeat_solve() {
        let a = sample_matrix();
        let mut solver = IndirectKkt::new(a.clone(), 1e-12, 200);

        let h1 = vec![1.0, 1.0];
        let h2 = vec![0.0, 0.0, 0.0];
        let mut x = vec![0.0; 2];
        let mut y = vec![0.0; 3];
        solver.solve_kkt(&h1, &h2, &mut x, &mut y).unwrap();
        let first = x.clone();
        solver.solve_kkt(&h1, &h2, &mut x, &mut y).unwrap();
        for (a_, b_) in first.iter().zip(x.iter()) {
            assert_relative_eq!(a_, b_, epsilon = 1e-9);
        }
    }
}
