//! Baseline splitting operator over the homogeneous self-dual embedding.
//!
//! One application of the operator performs the Douglas-Rachford-type
//! step of SCS: with the embedding variable u = (x, y, τ) and the skew
//! matrix
//!
//! ```text
//! Q = [  0   A^T  c ]
//!     [ -A    0   b ]
//!     [ -c^T -b^T 0 ]
//! ```
//!
//! the map is
//!
//! ```text
//! ũ = (I + Q)^{-1} w
//! u = Π_C(2ũ - w),   C = R^n × K* × R₊
//! T(w) = w + u - ũ
//! ```
//!
//! The (I + Q) solve reduces to the fixed embedding system of
//! [`KktSolver`](crate::linalg::KktSolver) plus a scalar Schur
//! complement on τ, using the precomputed vector g = F^{-1}(c, b).
//! The map is nonexpansive, so the acceleration loop may treat it as a
//! black box; the convergence monitor additionally reads the cached
//! ũ and u from the latest application.

use crate::cones::{ConeProjection, ProductCone};
use crate::linalg::{sparse, DirectKkt, IndirectKkt, KktError, KktSolver};
use crate::problem::{ProblemData, SolverSettings};
use thiserror::Error;

/// Fatal operator failures.
#[derive(Error, Debug)]
pub enum OperatorError {
    /// Embedding linear system could not be solved
    #[error(transparent)]
    Kkt(#[from] KktError),

    /// The Schur scalar of the embedding collapsed
    #[error("embedding system is singular: Schur denominator {0:.3e}")]
    SingularEmbedding(f64),

    /// A non-finite value appeared in the iterate or map output
    #[error("non-finite value in the working iterate")]
    NonFinite,
}

/// A nonexpansive fixed-point map on R^N.
///
/// The acceleration machinery relies on nothing beyond this contract,
/// which keeps it testable against synthetic operators with known fixed
/// points.
pub trait FixedPointMap {
    /// Iterate dimension N.
    fn dim(&self) -> usize;

    /// Apply the map: out = T(w).
    fn apply(&mut self, w: &[f64], out: &mut [f64]) -> Result<(), OperatorError>;
}

/// The conic splitting operator with cached projection state.
pub struct SplittingOperator {
    n: usize,
    m: usize,
    b: Vec<f64>,
    c: Vec<f64>,
    cone: ProductCone,
    kkt: Box<dyn KktSolver>,

    // g = F^{-1}(c, b) and its Schur denominator 1 + c.g_x + b.g_y
    g: Vec<f64>,
    schur_denom: f64,

    // state of the latest application, read by the monitor
    u_tilde: Vec<f64>,
    u: Vec<f64>,

    p: Vec<f64>,
    v: Vec<f64>,
}

const SCHUR_MIN: f64 = 1e-12;

impl SplittingOperator {
    /// Build the operator: choose the linear backend, factor it, and
    /// precompute the Schur vector g.
    pub fn new(prob: &ProblemData, settings: &SolverSettings) -> Result<Self, OperatorError> {
        let n = prob.num_vars();
        let m = prob.num_constraints();

        let mut kkt: Box<dyn KktSolver> = if settings.use_indirect_solve {
            Box::new(IndirectKkt::new(
                prob.A.clone(),
                settings.cg_tol,
                settings.cg_max_iters,
            ))
        } else {
            Box::new(DirectKkt::new(&prob.A, settings.static_reg)?)
        };

        let mut g = vec![0.0; n + m];
        {
            let (gx, gy) = g.split_at_mut(n);
            kkt.solve_kkt(&prob.c, &prob.b, gx, gy)?;
        }
        let schur_denom =
            1.0 + sparse::dot(&prob.c, &g[..n]) + sparse::dot(&prob.b, &g[n..]);
        if !schur_denom.is_finite() || schur_denom.abs() < SCHUR_MIN {
            return Err(OperatorError::SingularEmbedding(schur_denom));
        }

        Ok(Self {
            n,
            m,
            b: prob.b.clone(),
            c: prob.c.clone(),
            cone: ProductCone::from_specs(&prob.cones),
            kkt,
            g,
            schur_denom,
            u_tilde: vec![0.0; n + m + 1],
            u: vec![0.0; n + m + 1],
            p: vec![0.0; n + m],
            v: vec![0.0; n + m + 1],
        })
    }

    /// Number of primal variables.
    pub fn num_vars(&self) -> usize {
        self.n
    }

    /// Number of constraints.
    pub fn num_constraints(&self) -> usize {
        self.m
    }

    /// ũ from the latest application.
    pub fn u_tilde(&self) -> &[f64] {
        &self.u_tilde
    }

    /// Projected point u from the latest application.
    pub fn u(&self) -> &[f64] {
        &self.u
    }
}

impl FixedPointMap for SplittingOperator {
    fn dim(&self) -> usize {
        self.n + self.m + 1
    }

    fn apply(&mut self, w: &[f64], out: &mut [f64]) -> Result<(), OperatorError> {
        let (n, m) = (self.n, self.m);
        debug_assert_eq!(w.len(), n + m + 1);

        // ũ = (I + Q)^{-1} w: solve F p = (w_x, w_y), then recover τ̃
        // from the Schur complement and shift by g
        {
            let (px, py) = self.p.split_at_mut(n);
            self.kkt.solve_kkt(&w[..n], &w[n..n + m], px, py)?;
        }
        let tau_tilde = (w[n + m]
            + sparse::dot(&self.c, &self.p[..n])
            + sparse::dot(&self.b, &self.p[n..]))
            / self.schur_denom;
        for i in 0..n + m {
            self.u_tilde[i] = self.p[i] - tau_tilde * self.g[i];
        }
        self.u_tilde[n + m] = tau_tilde;

        // u = Π_C(2ũ - w): free block passes through, dual block projects
        // onto K*, τ clips at zero
        for i in 0..n + m + 1 {
            self.v[i] = 2.0 * self.u_tilde[i] - w[i];
        }
        self.u[..n].copy_from_slice(&self.v[..n]);
        self.cone
            .project_dual(&self.v[n..n + m], &mut self.u[n..n + m]);
        self.u[n + m] = self.v[n + m].max(0.0);

        // T(w) = w + u - ũ
        for i in 0..n + m + 1 {
            out[i] = w[i] + self.u[i] - self.u_tilde[i];
        }
        if out.iter().any(|x| !x.is_finite()) {
            return Err(OperatorError::NonFinite);
        }
        Ok(())
    }
}
