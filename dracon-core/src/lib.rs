//! dracon-core: an accelerated operator-splitting solver for convex
//! conic programs.
//!
//! Solves problems in the canonical form
//!
//! ```text
//! minimize    c^T x
//! subject to  A x + s = b
//!             s ∈ K
//! ```
//!
//! where K is a Cartesian product of zero, nonnegative, second-order,
//! semidefinite, and exponential cones. The core iteration is a
//! Douglas-Rachford splitting on the homogeneous self-dual embedding,
//! which classifies optimal, primal-infeasible, and dual-infeasible
//! instances alike. On top of the baseline iteration sits a safeguarded
//! acceleration engine: limited-memory quasi-Newton or Anderson
//! directions, a line search with a summable non-monotonicity
//! allowance, and a restart policy that discards a misleading history.
//!
//! # Example
//!
//! ```no_run
//! use dracon_core::{solve, ConeSpec, ProblemData, SolverSettings};
//! use dracon_core::linalg::sparse::from_triplets;
//!
//! // minimize x0 + x1  s.t.  x0 + x1 = 1, x >= 0
//! let prob = ProblemData {
//!     A: from_triplets(3, 2, vec![
//!         (0, 0, 1.0), (0, 1, 1.0),
//!         (1, 0, -1.0), (2, 1, -1.0),
//!     ]),
//!     b: vec![1.0, 0.0, 0.0],
//!     c: vec![1.0, 1.0],
//!     cones: vec![ConeSpec::Zero { dim: 1 }, ConeSpec::NonNeg { dim: 2 }],
//! };
//! let result = solve(&prob, &SolverSettings::default()).unwrap();
//! println!("{}: objective {:.6}", result.status, result.primal_obj);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod accel;
pub mod cones;
pub mod linalg;
pub mod problem;
pub mod splitting;

pub use problem::{
    ConeSpec, DirectionKind, ProblemData, ProgressRecord, SolveInfo, SolveResult, SolveStatus,
    SolverSettings,
};
pub use splitting::{run_loop, FixedPointMap, OperatorError, SplittingOperator};

use log::{debug, warn};
use splitting::{ConvergenceMonitor, Verdict};
use std::time::Instant;

/// Solve a conic problem.
///
/// Returns an error only for invalid inputs or a failed solver setup;
/// numerical breakdown during the iteration is reported through
/// [`SolveStatus::NumericalError`] in the result instead.
pub fn solve(
    prob: &ProblemData,
    settings: &SolverSettings,
) -> Result<SolveResult, Box<dyn std::error::Error>> {
    prob.validate()?;
    settings.validate()?;

    let start = Instant::now();
    let dim = prob.embedding_dim();

    let mut op = SplittingOperator::new(prob, settings)?;
    let mut monitor = ConvergenceMonitor::new(prob, settings);

    let w0 = match &settings.warm_start {
        Some(w) => {
            if w.len() != dim {
                return Err(format!(
                    "warm start has length {}, expected {}",
                    w.len(),
                    dim
                )
                .into());
            }
            w.clone()
        }
        None => {
            // Cold start at the origin with unit embedding scale
            let mut w = vec![0.0; dim];
            w[dim - 1] = 1.0;
            w
        }
    };

    debug!(
        "solving: n={} m={} direction={} memory={}",
        prob.num_vars(),
        prob.num_constraints(),
        settings.direction,
        settings.memory
    );

    match run_loop(&mut op, &mut monitor, settings, w0) {
        Ok(outcome) => {
            let status = match outcome.verdict {
                Some(Verdict::Solved) => SolveStatus::Solved,
                Some(Verdict::PrimalInfeasible) => SolveStatus::PrimalInfeasible,
                Some(Verdict::DualInfeasible) => SolveStatus::DualInfeasible,
                None => SolveStatus::MaxIters,
            };
            let extraction = monitor.finalize(&op, &outcome.w, status);

            Ok(SolveResult {
                status,
                x: extraction.x,
                y: extraction.y,
                s: extraction.s,
                primal_obj: extraction.primal_obj,
                dual_obj: extraction.dual_obj,
                info: SolveInfo {
                    iters: outcome.iters,
                    solve_time_ms: start.elapsed().as_millis() as u64,
                    primal_res: extraction.primal_res,
                    dual_res: extraction.dual_res,
                    gap: extraction.gap,
                    residual_norm: outcome.residual_norm,
                    accepted_steps: outcome.accepted_steps,
                    rejected_steps: outcome.rejected_steps,
                    restarts: outcome.restarts,
                },
                progress: outcome.progress,
            })
        }
        Err(err) => {
            warn!("solve aborted: {}", err);
            Ok(SolveResult {
                status: SolveStatus::NumericalError,
                x: vec![0.0; prob.num_vars()],
                y: vec![0.0; prob.num_constraints()],
                s: vec![0.0; prob.num_constraints()],
                primal_obj: f64::NAN,
                dual_obj: f64::NAN,
                info: SolveInfo {
                    solve_time_ms: start.elapsed().as_millis() as u64,
                    ..Default::default()
                },
                progress: None,
            })
        }
    }
}
