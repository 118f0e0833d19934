//! Direction strategy dispatch.
//!
//! The strategy is fixed at configuration time. A failed direction
//! computation never aborts the solve; the iteration degrades to the
//! baseline update for that step, and ill-conditioning additionally
//! feeds the restart policy.

use super::anderson::AndersonDirection;
use super::broyden::{BroydenDirection, DirectionFailure};
use super::memory::DirectionMemory;
use crate::problem::DirectionKind;

/// Configured direction strategy with per-strategy state.
pub enum DirectionStrategy {
    /// Baseline iteration, no candidate directions at all
    None,

    /// d = -R, a memory-free relaxation of the baseline step
    FixedPointResidual,

    /// Restarted limited-memory Broyden
    Broyden(BroydenDirection),

    /// Anderson type-II extrapolation
    Anderson(AndersonDirection),
}

impl DirectionStrategy {
    /// Instantiate the strategy for iterates of length `dim`.
    pub fn from_kind(kind: DirectionKind, dim: usize) -> Self {
        match kind {
            DirectionKind::None => DirectionStrategy::None,
            DirectionKind::FixedPointResidual => DirectionStrategy::FixedPointResidual,
            DirectionKind::RestartedBroyden => {
                DirectionStrategy::Broyden(BroydenDirection::new(dim))
            }
            DirectionKind::Anderson => DirectionStrategy::Anderson(AndersonDirection::new()),
        }
    }

    /// Whether the strategy consumes the secant history.
    pub fn uses_memory(&self) -> bool {
        matches!(
            self,
            DirectionStrategy::Broyden(_) | DirectionStrategy::Anderson(_)
        )
    }

    /// Anderson directions are pure extrapolations: either the unit step
    /// passes the safeguard or the candidate is rejected outright, no
    /// backtracking.
    pub fn single_attempt(&self) -> bool {
        matches!(self, DirectionStrategy::Anderson(_))
    }

    /// Compute a candidate direction from the current residual.
    pub fn compute(
        &mut self,
        memory: &DirectionMemory,
        residual: &[f64],
        out: &mut [f64],
    ) -> Result<(), DirectionFailure> {
        match self {
            DirectionStrategy::None => Err(DirectionFailure::EmptyMemory),
            DirectionStrategy::FixedPointResidual => {
                for (o, &ri) in out.iter_mut().zip(residual.iter()) {
                    *o = -ri;
                }
                Ok(())
            }
            DirectionStrategy::Broyden(b) => b.compute(memory, residual, out),
            DirectionStrategy::Anderson(a) => a.compute(memory, residual, out),
        }
    }
}
