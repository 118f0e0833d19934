//! Fixed-point iteration loop: warm-up, accelerated stepping, and
//! termination handling.
//!
//! The loop is generic over the [`FixedPointMap`] and the
//! [`ConvergenceCheck`], so the same orchestration runs the conic
//! operator in production and synthetic nonexpansive maps in tests.
//!
//! Invariants the loop maintains:
//! - the operator's cached state always corresponds to its latest
//!   application, which is always at the current iterate when the
//!   monitor runs;
//! - with the `none` strategy (or zero memory) each iteration performs
//!   exactly one operator application and reproduces the plain
//!   splitting iteration w ← T(w) bit for bit;
//! - the secant history is fed the actually-taken step every iteration,
//!   accelerated or baseline.

pub mod operator;
pub mod termination;

pub use operator::{FixedPointMap, OperatorError, SplittingOperator};
pub use termination::{ConvergenceCheck, ConvergenceMonitor, Extraction, ResidualNormCheck, Verdict};

use crate::accel::AccelerationEngine;
use crate::linalg::sparse;
use crate::problem::{ProgressRecord, SolverSettings};
use log::{debug, info};
use std::time::Instant;

/// Loop phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Warmup,
    Accelerating,
    Terminated,
}

/// Everything the loop learned before terminating.
#[derive(Debug)]
pub struct LoopOutcome {
    /// Monitor verdict, or None when a budget ran out first
    pub verdict: Option<Verdict>,

    /// Final working iterate
    pub w: Vec<f64>,

    /// Iterations completed
    pub iters: usize,

    /// Final fixed-point residual norm
    pub residual_norm: f64,

    /// Accepted accelerated steps
    pub accepted_steps: usize,

    /// Rejected accelerated candidates
    pub rejected_steps: usize,

    /// Direction-history restarts
    pub restarts: usize,

    /// Per-iteration trace when requested
    pub progress: Option<Vec<ProgressRecord>>,
}

/// Drive the safeguarded accelerated iteration to termination.
pub fn run_loop<M, C>(
    op: &mut M,
    monitor: &mut C,
    settings: &SolverSettings,
    mut w: Vec<f64>,
) -> Result<LoopOutcome, OperatorError>
where
    M: FixedPointMap,
    C: ConvergenceCheck<M>,
{
    let dim = op.dim();
    assert_eq!(w.len(), dim);
    let start = Instant::now();

    let mut engine = AccelerationEngine::new(settings, dim);

    let mut tw = vec![0.0; dim];
    op.apply(&w, &mut tw)?;
    let mut residual = vec![0.0; dim];
    sparse::sub(&w, &tw, &mut residual);
    let mut rn = sparse::norm2(&residual);
    engine.arm(rn);

    let mut trial = vec![0.0; dim];
    let mut tw_trial = vec![0.0; dim];
    let mut r_trial = vec![0.0; dim];

    let mut phase = if settings.k0 == 0 {
        Phase::Accelerating
    } else {
        Phase::Warmup
    };
    let mut verdict = None;
    let mut completed = 0;
    let mut accepted_steps = 0;
    let mut rejected_steps = 0;
    let mut progress: Option<Vec<ProgressRecord>> =
        settings.do_record_progress.then(Vec::new);

    for iter in 0..settings.max_iter {
        if !rn.is_finite() {
            debug!("residual became non-finite at iteration {}", iter);
            return Err(OperatorError::NonFinite);
        }

        if iter % settings.check_interval == 0 {
            if let Some(v) = monitor.check(op, &w, rn, iter) {
                verdict = Some(v);
                phase = Phase::Terminated;
                break;
            }
            if settings.verbose {
                info!(
                    "iter {:>6}  residual {:.6e}  accepted {}  restarts {}",
                    iter,
                    rn,
                    accepted_steps,
                    engine.restarts()
                );
            }
        }

        if let Some(limit_ms) = settings.time_limit_ms {
            if start.elapsed().as_millis() as u64 >= limit_ms {
                debug!("time budget exhausted at iteration {}", iter);
                break;
            }
        }

        if phase == Phase::Warmup && iter >= settings.k0 {
            phase = Phase::Accelerating;
            debug!("warm-up finished after {} iterations", settings.k0);
        }

        let mut accepted_this = false;
        let mut step_length = 1.0;

        let direction = engine.propose(iter, &residual).map(<[f64]>::to_vec);
        if let Some(d) = direction {
            let taus: Vec<f64> = engine.step_lengths().collect();
            for tau in taus {
                trial.copy_from_slice(&w);
                sparse::axpy(tau, &d, &mut trial);
                op.apply(&trial, &mut tw_trial)?;
                sparse::sub(&trial, &tw_trial, &mut r_trial);
                let tn = sparse::norm2(&r_trial);

                if engine.accepts(tn, rn) {
                    engine.record_outcome(true);
                    let mut dw = vec![0.0; dim];
                    let mut dr = vec![0.0; dim];
                    sparse::sub(&trial, &w, &mut dw);
                    sparse::sub(&r_trial, &residual, &mut dr);
                    engine.record_pair(dw, dr);

                    w.copy_from_slice(&trial);
                    tw.copy_from_slice(&tw_trial);
                    residual.copy_from_slice(&r_trial);
                    rn = tn;
                    accepted_steps += 1;
                    accepted_this = true;
                    step_length = tau;
                    break;
                }
            }
            if !accepted_this {
                rejected_steps += 1;
                if engine.record_outcome(false) {
                    debug!("direction history restarted at iteration {}", iter);
                }
            }
        }

        if !accepted_this {
            // Baseline step w ← T(w); the map output is already cached
            // in tw from the application at w
            let mut dw = vec![0.0; dim];
            sparse::sub(&tw, &w, &mut dw);
            w.copy_from_slice(&tw);
            op.apply(&w, &mut tw)?;
            sparse::sub(&w, &tw, &mut r_trial);
            let mut dr = vec![0.0; dim];
            sparse::sub(&r_trial, &residual, &mut dr);
            engine.record_pair(dw, dr);
            residual.copy_from_slice(&r_trial);
            rn = sparse::norm2(&residual);
        }

        completed = iter + 1;
        if let Some(records) = progress.as_mut() {
            records.push(ProgressRecord {
                iter,
                residual_norm: rn,
                accepted: accepted_this,
                step_length: if accepted_this { step_length } else { 1.0 },
                elapsed: start.elapsed(),
            });
        }
    }

    // Last chance for a verdict when the budget ran out between checks
    if verdict.is_none() && phase != Phase::Terminated {
        verdict = monitor.check(op, &w, rn, completed);
    }

    Ok(LoopOutcome {
        verdict,
        w,
        iters: completed,
        residual_norm: rn,
        accepted_steps,
        rejected_steps,
        restarts: engine.restarts(),
        progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::DirectionKind;

    /// Contraction toward a known fixed point, trivially nonexpansive.
    struct Contraction {
        target: Vec<f64>,
        rate: f64,
    }

    impl FixedPointMap for Contraction {
        fn dim(&self) -> usize {
            self.target.len()
        }
        fn apply(&mut self, w: &[f64], out: &mut [f64]) -> Result<(), OperatorError> {
            for i in 0..w.len() {
                out[i] = self.target[i] + self.rate * (w[i] - self.target[i]);
            }
            Ok(())
        }
    }

    #[test]
    fn test_baseline_loop_converges() {
        let mut op = Contraction {
            target: vec![1.0, -2.0, 0.5],
            rate: 0.9,
        };
        let mut check = ResidualNormCheck { tol: 1e-10 };
        let settings = SolverSettings {
            direction: DirectionKind::None,
            check_interval: 1,
            max_iter: 2000,
            ..Default::default()
        };
        let outcome = run_loop(&mut op, &mut check, &settings, vec![0.0; 3]).unwrap();
        assert_eq!(outcome.verdict, Some(Verdict::Solved));
        for (wi, ti) in outcome.w.iter().zip([1.0, -2.0, 0.5]) {
            assert!((wi - ti).abs() < 1e-8);
        }
    }

    #[test]
    fn test_acceleration_beats_baseline_on_contraction() {
        let target = vec![1.0, -2.0, 0.5, 3.0];
        let run = |kind: DirectionKind| {
            let mut op = Contraction {
                target: target.clone(),
                rate: 0.95,
            };
            let mut check = ResidualNormCheck { tol: 1e-9 };
            let settings = SolverSettings {
                direction: kind,
                check_interval: 1,
                max_iter: 5000,
                memory: 5,
                ..Default::default()
            };
            run_loop(&mut op, &mut check, &settings, vec![0.0; 4]).unwrap()
        };

        let plain = run(DirectionKind::None);
        let broyden = run(DirectionKind::RestartedBroyden);
        assert_eq!(plain.verdict, Some(Verdict::Solved));
        assert_eq!(broyden.verdict, Some(Verdict::Solved));
        assert!(
            broyden.iters < plain.iters,
            "broyden {} vs plain {}",
            broyden.iters,
            plain.iters
        );
    }

    #[test]
    fn test_progress_trace_recorded() {
        let mut op = Contraction {
            target: vec![0.0, 0.0],
            rate: 0.5,
        };
        let mut check = ResidualNormCheck { tol: 1e-8 };
        let settings = SolverSettings {
            direction: DirectionKind::None,
            check_interval: 5,
            do_record_progress: true,
            ..Default::default()
        };
        let outcome = run_loop(&mut op, &mut check, &settings, vec![4.0, -4.0]).unwrap();
        let trace = outcome.progress.expect("trace requested");
        assert_eq!(trace.len(), outcome.iters);
        // Residual shrinks monotonically for the plain contraction
        for pair in trace.windows(2) {
            assert!(pair[1].residual_norm <= pair[0].residual_norm + 1e-15);
        }
    }
}
