//! Problem data structures and solver configuration.
//!
//! This module defines the canonical conic problem representation, the
//! immutable solver settings, and all result types.

use std::fmt;
use std::time::Duration;

/// Sparse matrix in CSC format.
pub type SparseCsc = sprs::CsMat<f64>;

/// Conic optimization problem in canonical form.
///
/// The solver works with the canonical linear conic formulation:
///
/// ```text
/// minimize    c^T x
/// subject to  A x + s = b
///             s ∈ K
/// ```
///
/// where K is a Cartesian product of cones. The dual pair is
/// `maximize -b^T y  s.t.  A^T y + c = 0, y ∈ K*`.
///
/// # Dimensions
///
/// - `n`: number of primal variables (length of x)
/// - `m`: number of constraints (length of b, number of rows in A)
/// - A: m × n
/// - b: m
/// - s, y: m (partitioned by cones)
#[derive(Debug, Clone)]
#[allow(non_snake_case)] // A is standard mathematical notation
pub struct ProblemData {
    /// Constraint matrix A (m × n, CSC format)
    pub A: SparseCsc,

    /// Constraint right-hand side b (length m)
    pub b: Vec<f64>,

    /// Linear cost vector c (length n)
    pub c: Vec<f64>,

    /// Cone specifications partitioning the m-dimensional slack/dual space
    pub cones: Vec<ConeSpec>,
}

/// Cone specification.
///
/// Each cone type corresponds to a block in the Cartesian product
/// K = K₁ × K₂ × ... × Kₚ.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)] // Enum variant fields are self-documenting
pub enum ConeSpec {
    /// Zero cone: {0}^dim (equality constraints).
    Zero { dim: usize },

    /// Nonnegative orthant: ℝ₊^dim
    NonNeg { dim: usize },

    /// Second-order (Lorentz) cone: {(t, x) : t ≥ ||x||₂}
    /// Dimension must be at least 2.
    Soc { dim: usize },

    /// Positive semidefinite cone: S₊^n (n × n symmetric matrices)
    /// Stored in svec format: dimension = n(n+1)/2
    Psd { n: usize },

    /// Exponential cone: closure{(x,y,z) : y > 0, y exp(x/y) ≤ z}
    /// Always 3D per block; `count` specifies number of blocks
    Exp { count: usize },
}

impl ConeSpec {
    /// Get the dimension of this cone in the m-dimensional space
    pub fn dim(&self) -> usize {
        match self {
            ConeSpec::Zero { dim } => *dim,
            ConeSpec::NonNeg { dim } => *dim,
            ConeSpec::Soc { dim } => *dim,
            ConeSpec::Psd { n } => n * (n + 1) / 2, // svec dimension
            ConeSpec::Exp { count } => 3 * count,
        }
    }

    /// Validate this cone specification
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ConeSpec::Zero { dim } => {
                if *dim == 0 {
                    return Err("Zero cone must have positive dimension".to_string());
                }
            }
            ConeSpec::NonNeg { dim } => {
                if *dim == 0 {
                    return Err("NonNeg cone must have positive dimension".to_string());
                }
            }
            ConeSpec::Soc { dim } => {
                if *dim < 2 {
                    return Err(format!("SOC cone must have dimension >= 2, got {}", dim));
                }
            }
            ConeSpec::Psd { n } => {
                if *n == 0 {
                    return Err("PSD cone must have positive size".to_string());
                }
            }
            ConeSpec::Exp { count } => {
                if *count == 0 {
                    return Err("Exp cone must have positive count".to_string());
                }
            }
        }
        Ok(())
    }
}

impl ProblemData {
    /// Get the number of primal variables (n)
    pub fn num_vars(&self) -> usize {
        self.c.len()
    }

    /// Get the number of constraints (m)
    pub fn num_constraints(&self) -> usize {
        self.b.len()
    }

    /// Dimension of the working iterate of the homogeneous embedding:
    /// N = n + m + 1 (primal block, dual block, embedding scale).
    pub fn embedding_dim(&self) -> usize {
        self.num_vars() + self.num_constraints() + 1
    }

    /// Validate problem dimensions and cone partitioning
    pub fn validate(&self) -> Result<(), String> {
        let n = self.num_vars();
        let m = self.num_constraints();

        if self.A.rows() != m {
            return Err(format!("A has {} rows, expected {}", self.A.rows(), m));
        }
        if self.A.cols() != n {
            return Err(format!("A has {} cols, expected {}", self.A.cols(), n));
        }

        let cone_total_dim: usize = self.cones.iter().map(|c| c.dim()).sum();
        if cone_total_dim != m {
            return Err(format!(
                "Cone dimensions sum to {}, expected {}",
                cone_total_dim, m
            ));
        }

        for cone in &self.cones {
            cone.validate()?;
        }

        if self.b.iter().any(|v| !v.is_finite()) {
            return Err("b contains non-finite entries".to_string());
        }
        if self.c.iter().any(|v| !v.is_finite()) {
            return Err("c contains non-finite entries".to_string());
        }

        Ok(())
    }
}

/// Acceleration direction strategy.
///
/// Selected once at configuration time; the orchestrator never switches
/// strategies mid-solve (a per-iteration "unavailable" signal degrades a
/// single step to the baseline, nothing more).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionKind {
    /// Plain splitting iteration, no acceleration.
    None,

    /// Candidate direction equals the current fixed-point residual
    /// (memory-free relaxation/extrapolation).
    FixedPointResidual,

    /// Restarted limited-memory Broyden quasi-Newton directions.
    RestartedBroyden,

    /// Anderson acceleration (type-II) over the stored residual history.
    Anderson,
}

impl fmt::Display for DirectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionKind::None => write!(f, "none"),
            DirectionKind::FixedPointResidual => write!(f, "fixed-point-residual"),
            DirectionKind::RestartedBroyden => write!(f, "restarted-broyden"),
            DirectionKind::Anderson => write!(f, "anderson"),
        }
    }
}

/// Solver settings and parameters.
///
/// Supplied once at solve start and immutable thereafter.
#[derive(Debug, Clone)]
pub struct SolverSettings {
    /// Maximum number of splitting iterations
    pub max_iter: usize,

    /// Time limit in milliseconds (None = no limit). Exhaustion terminates
    /// with `MaxIters` and the best iterate found so far.
    pub time_limit_ms: Option<u64>,

    /// Stopping accuracy for the normalized primal/dual residuals and gap
    pub tolerance: f64,

    /// Convergence checks run every `check_interval` iterations
    pub check_interval: usize,

    /// Acceleration direction strategy
    pub direction: DirectionKind,

    /// Length of the direction history (0 disables acceleration entirely)
    pub memory: usize,

    /// Max backtracking attempts per iteration in the safeguarded line search
    pub line_search_steps: usize,

    /// Number of unaccelerated warm-start iterations before the direction
    /// engine activates
    pub k0: usize,

    /// Safeguard contraction factor c < 1: an accelerated step is accepted
    /// when its residual norm is below c * (current residual norm) plus the
    /// remaining allowance
    pub safeguard_factor: f64,

    /// Total safeguard allowance, as a multiple of the initial residual norm.
    /// The cumulative excess over the contraction bound stays below this
    /// budget, which is what preserves global convergence.
    pub allowance_budget: f64,

    /// Geometric spending rate of the allowance: each accepted accelerated
    /// step may consume a (1 - decay) fraction of the remaining budget
    pub allowance_decay: f64,

    /// Backtracking shrink factor β for the line search step length
    pub line_search_shrink: f64,

    /// Consecutive safeguard rejections before the direction history is
    /// cleared and the allowance reset
    pub restart_rejections: usize,

    /// Use the indirect (conjugate gradient) linear solver for the embedding
    /// system instead of the direct LDL factorization
    pub use_indirect_solve: bool,

    /// Relative tolerance of the indirect CG solve
    pub cg_tol: f64,

    /// Iteration cap of the indirect CG solve
    pub cg_max_iters: usize,

    /// Static diagonal regularization for the direct LDL factorization
    pub static_reg: f64,

    /// Enable verbose per-check iteration tracing
    pub verbose: bool,

    /// Record a per-iteration progress trace in the result
    pub do_record_progress: bool,

    /// Optional initial working iterate of length n + m + 1
    pub warm_start: Option<Vec<f64>>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iter: 10_000,
            time_limit_ms: None,
            tolerance: 1e-6,
            check_interval: 25,
            direction: DirectionKind::RestartedBroyden,
            memory: 10,
            line_search_steps: 10,
            k0: 0,
            safeguard_factor: 0.99,
            allowance_budget: 1.0,
            allowance_decay: 0.5,
            line_search_shrink: 0.5,
            restart_rejections: 3,
            use_indirect_solve: false,
            cg_tol: 1e-10,
            cg_max_iters: 500,
            static_reg: 1e-8,
            verbose: false,
            do_record_progress: false,
            warm_start: None,
        }
    }
}

impl SolverSettings {
    /// Validate settings ranges.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.tolerance > 0.0) {
            return Err(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if !(self.safeguard_factor > 0.0 && self.safeguard_factor < 1.0) {
            return Err(format!(
                "safeguard_factor must lie in (0, 1), got {}",
                self.safeguard_factor
            ));
        }
        if !(self.line_search_shrink > 0.0 && self.line_search_shrink < 1.0) {
            return Err(format!(
                "line_search_shrink must lie in (0, 1), got {}",
                self.line_search_shrink
            ));
        }
        if !(self.allowance_decay > 0.0 && self.allowance_decay < 1.0) {
            return Err(format!(
                "allowance_decay must lie in (0, 1), got {}",
                self.allowance_decay
            ));
        }
        if self.allowance_budget < 0.0 {
            return Err("allowance_budget must be non-negative".to_string());
        }
        if self.check_interval == 0 {
            return Err("check_interval must be positive".to_string());
        }
        if self.restart_rejections == 0 {
            return Err("restart_rejections must be positive".to_string());
        }
        Ok(())
    }
}

/// Solution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found to the requested tolerance
    Solved,

    /// Primal problem is infeasible (certificate returned in `y`)
    PrimalInfeasible,

    /// Dual problem is infeasible, primal unbounded (certificate in `x`, `s`)
    DualInfeasible,

    /// Iteration or time budget reached; returned iterate is inaccurate
    MaxIters,

    /// Non-finite values or a terminal linear-solve/projection failure
    NumericalError,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Solved => write!(f, "Solved"),
            SolveStatus::PrimalInfeasible => write!(f, "Primal Infeasible"),
            SolveStatus::DualInfeasible => write!(f, "Dual Infeasible"),
            SolveStatus::MaxIters => write!(f, "MaxIters"),
            SolveStatus::NumericalError => write!(f, "Numerical Error"),
        }
    }
}

/// Per-iteration progress snapshot (only recorded when
/// `do_record_progress` is set).
#[derive(Debug, Clone)]
pub struct ProgressRecord {
    /// Iteration index
    pub iter: usize,

    /// Fixed-point residual norm after this iteration
    pub residual_norm: f64,

    /// Whether the accelerated candidate step was accepted
    pub accepted: bool,

    /// Step length of the accepted candidate (1.0 for baseline steps)
    pub step_length: f64,

    /// Elapsed time since solve start
    pub elapsed: Duration,
}

/// Solve result with solution and diagnostics.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Solution status
    pub status: SolveStatus,

    /// Primal solution x (length n); an unboundedness certificate ray when
    /// the status is `DualInfeasible`
    pub x: Vec<f64>,

    /// Dual solution y (length m); an infeasibility certificate when the
    /// status is `PrimalInfeasible`
    pub y: Vec<f64>,

    /// Primal slack s (length m)
    pub s: Vec<f64>,

    /// Primal objective value c^T x
    pub primal_obj: f64,

    /// Dual objective value -b^T y
    pub dual_obj: f64,

    /// Detailed solve information and diagnostics
    pub info: SolveInfo,

    /// Optional per-iteration progress trace
    pub progress: Option<Vec<ProgressRecord>>,
}

/// Detailed solve information and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SolveInfo {
    /// Number of splitting iterations completed
    pub iters: usize,

    /// Total solve time (milliseconds)
    pub solve_time_ms: u64,

    /// Final normalized primal residual
    pub primal_res: f64,

    /// Final normalized dual residual
    pub dual_res: f64,

    /// Final normalized duality gap
    pub gap: f64,

    /// Final fixed-point residual norm
    pub residual_norm: f64,

    /// Accepted accelerated steps
    pub accepted_steps: usize,

    /// Rejected accelerated candidates (fell back to the baseline step)
    pub rejected_steps: usize,

    /// Direction-history restarts triggered
    pub restarts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::sparse;

    #[test]
    fn test_cone_dim() {
        assert_eq!(ConeSpec::Zero { dim: 5 }.dim(), 5);
        assert_eq!(ConeSpec::NonNeg { dim: 10 }.dim(), 10);
        assert_eq!(ConeSpec::Soc { dim: 7 }.dim(), 7);
        assert_eq!(ConeSpec::Psd { n: 3 }.dim(), 6); // 3*4/2
        assert_eq!(ConeSpec::Exp { count: 2 }.dim(), 6);
    }

    #[test]
    fn test_cone_validation() {
        assert!(ConeSpec::Zero { dim: 1 }.validate().is_ok());
        assert!(ConeSpec::NonNeg { dim: 1 }.validate().is_ok());
        assert!(ConeSpec::Soc { dim: 2 }.validate().is_ok());
        assert!(ConeSpec::Psd { n: 2 }.validate().is_ok());
        assert!(ConeSpec::Exp { count: 1 }.validate().is_ok());

        assert!(ConeSpec::Zero { dim: 0 }.validate().is_err());
        assert!(ConeSpec::Soc { dim: 1 }.validate().is_err());
        assert!(ConeSpec::Exp { count: 0 }.validate().is_err());
    }

    #[test]
    fn test_problem_validation() {
        let prob = ProblemData {
            A: sparse::from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, 1.0)]),
            b: vec![1.0],
            c: vec![1.0, 1.0],
            cones: vec![ConeSpec::Zero { dim: 1 }],
        };
        assert!(prob.validate().is_ok());
        assert_eq!(prob.embedding_dim(), 4);

        // Cone partition does not cover m
        let bad = ProblemData {
            cones: vec![ConeSpec::NonNeg { dim: 2 }],
            ..prob.clone()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_settings_validation() {
        assert!(SolverSettings::default().validate().is_ok());

        let bad = SolverSettings {
            safeguard_factor: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = SolverSettings {
            check_interval: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
