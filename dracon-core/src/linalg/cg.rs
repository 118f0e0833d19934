//! Conjugate gradient solver.
//!
//! Matrix-free CG for symmetric positive definite operators, used by the
//! indirect path to solve the normal-equation reduction of the embedding
//! system. The operator is supplied as a closure so callers can fuse the
//! two sparse products of (I + A^T A) without materializing it.

use super::sparse;
use thiserror::Error;

/// CG failure modes.
#[derive(Error, Debug)]
pub enum CgError {
    /// Iteration produced a non-finite quantity
    #[error("conjugate gradient diverged: non-finite iterate at iteration {0}")]
    NonFinite(usize),

    /// p^T A p collapsed, operator is not positive definite
    #[error("conjugate gradient breakdown: curvature {curvature:.3e} at iteration {iter}")]
    Breakdown {
        /// Offending curvature value
        curvature: f64,
        /// Iteration at which it occurred
        iter: usize,
    },
}

/// Conjugate gradient loop with reusable workspace.
pub struct CgSolver {
    tol: f64,
    max_iters: usize,
    r: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
}

impl CgSolver {
    /// Create a solver for systems of dimension `n` with relative
    /// residual tolerance `tol` and iteration cap `max_iters`.
    pub fn new(n: usize, tol: f64, max_iters: usize) -> Self {
        Self {
            tol,
            max_iters,
            r: vec![0.0; n],
            p: vec![0.0; n],
            ap: vec![0.0; n],
        }
    }

    /// Solve M x = b where `apply` computes out = M * v.
    ///
    /// `x` doubles as the initial guess, so callers can warm-start from
    /// the previous solve. Returns the number of iterations taken.
    pub fn solve<F>(&mut self, mut apply: F, b: &[f64], x: &mut [f64]) -> Result<usize, CgError>
    where
        F: FnMut(&[f64], &mut [f64]),
    {
        let n = b.len();
        assert_eq!(x.len(), n);
        assert_eq!(self.r.len(), n);

        // r = b - M x0
        apply(x, &mut self.ap);
        sparse::sub(b, &self.ap, &mut self.r);
        self.p.copy_from_slice(&self.r);

        let b_norm = sparse::norm2(b);
        let stop = self.tol * b_norm.max(f64::MIN_POSITIVE);
        let mut rr = sparse::dot(&self.r, &self.r);
        if rr.sqrt() <= stop {
            return Ok(0);
        }

        for iter in 0..self.max_iters {
            apply(&self.p, &mut self.ap);
            let curvature = sparse::dot(&self.p, &self.ap);
            if !curvature.is_finite() {
                return Err(CgError::NonFinite(iter));
            }
            if curvature <= 0.0 {
                return Err(CgError::Breakdown { curvature, iter });
            }

            let alpha = rr / curvature;
            sparse::axpy(alpha, &self.p, x);
            sparse::axpy(-alpha, &self.ap, &mut self.r);

            let rr_next = sparse::dot(&self.r, &self.r);
            if !rr_next.is_finite() {
                return Err(CgError::NonFinite(iter));
            }
            if rr_next.sqrt() <= stop {
                return Ok(iter + 1);
            }

            let beta = rr_next / rr;
            for (pi, &ri) in self.p.iter_mut().zip(self.r.iter()) {
                *pi = ri + beta * *pi;
            }
            rr = rr_next;
        }

        // Cap reached; accept the iterate the caller has
        Ok(self.max_iters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cg_diagonal_system() {
        let diag = [2.0, 4.0, 8.0];
        let apply = |v: &[f64], out: &mut [f64]| {
            for i in 0..3 {
                out[i] = diag[i] * v[i];
            }
        };
        let b = vec![2.0, 4.0, 8.0];
        let mut x = vec![0.0; 3];
        let mut cg = CgSolver::new(3, 1e-12, 50);
        let iters = cg.solve(apply, &b, &mut x).unwrap();
        assert!(iters <= 3);
        for xi in &x {
            assert_relative_eq!(*xi, 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_cg_dense_spd() {
        // M = [[4, 1], [1, 3]], b = [1, 2], x* = [1/11, 7/11]
        let apply = |v: &[f64], out: &mut [f64]| {
            out[0] = 4.0 * v[0] + v[1];
            out[1] = v[0] + 3.0 * v[1];
        };
        let b = vec![1.0, 2.0];
        let mut x = vec![0.0; 2];
        let mut cg = CgSolver::new(2, 1e-12, 50);
        cg.solve(apply, &b, &mut x).unwrap();
        assert_relative_eq!(x[0], 1.0 / 11.0, epsilon = 1e-9);
        assert_relative_eq!(x[1], 7.0 / 11.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cg_warm_start_exact() {
        let apply = |v: &[f64], out: &mut [f64]| out.copy_from_slice(v);
        let b = vec![1.0, -2.0];
        let mut x = b.clone();
        let mut cg = CgSolver::new(2, 1e-10, 50);
        let iters = cg.solve(apply, &b, &mut x).unwrap();
        assert_eq!(iters, 0);
    }

    #[test]
    fn test_cg_indefinite_breakdown() {
        let apply = |v: &[f64], out: &mut [f64]| {
            out[0] = -v[0];
            out[1] = -v[1];
        };
        let b = vec![1.0, 1.0];
        let mut x = vec![0.0; 2];
        let mut cg = CgSolver::new(2, 1e-10, 50);
        assert!(matches!(
            cg.solve(apply, &b, &mut x),
            Err(CgError::Breakdown { .. })
        ));
    }
}
