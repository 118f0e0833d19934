//! Acceleration engine: direction strategies, safeguarded line search,
//! and the restart policy, behind one facade the iteration loop drives.
//!
//! The engine never applies the operator itself. It proposes a direction
//! and a backtracking schedule, judges trial residual norms, and keeps
//! its secant history and allowance bookkeeping consistent; the caller
//! owns every operator application.

pub mod anderson;
pub mod broyden;
pub mod direction;
pub mod line_search;
pub mod memory;
pub mod restart;

pub use anderson::AndersonDirection;
pub use broyden::{BroydenDirection, DirectionFailure};
pub use direction::DirectionStrategy;
pub use line_search::LineSearchGuard;
pub use memory::DirectionMemory;
pub use restart::RestartController;

use crate::problem::SolverSettings;

/// Facade combining strategy, memory, safeguard, and restart policy.
pub struct AccelerationEngine {
    strategy: DirectionStrategy,
    memory: DirectionMemory,
    guard: LineSearchGuard,
    restart: RestartController,
    k0: usize,
    initial_norm: f64,
    direction: Vec<f64>,
}

impl AccelerationEngine {
    /// Build the engine for iterates of length `dim`.
    pub fn new(settings: &SolverSettings, dim: usize) -> Self {
        Self {
            strategy: DirectionStrategy::from_kind(settings.direction, dim),
            memory: DirectionMemory::new(settings.memory, dim),
            guard: LineSearchGuard::new(
                settings.safeguard_factor,
                settings.line_search_shrink,
                settings.line_search_steps,
                settings.allowance_decay,
                settings.allowance_budget,
            ),
            restart: RestartController::new(settings.restart_rejections),
            k0: settings.k0,
            initial_norm: 0.0,
            direction: vec![0.0; dim],
        }
    }

    /// Arm the safeguard allowance from the residual norm at the initial
    /// iterate. Must be called before the first `propose`.
    pub fn arm(&mut self, initial_residual_norm: f64) {
        self.initial_norm = initial_residual_norm;
        self.guard.reset_allowance(initial_residual_norm);
    }

    /// Whether acceleration participates at this iteration. Warm-up
    /// iterations and a zero memory setting bypass the engine entirely.
    pub fn active(&self, iter: usize) -> bool {
        if iter < self.k0 {
            return false;
        }
        match self.strategy {
            DirectionStrategy::None => false,
            _ => self.memory.capacity() > 0,
        }
    }

    /// Propose a candidate direction for the current residual, or None
    /// when the strategy has nothing usable this iteration.
    pub fn propose(&mut self, iter: usize, residual: &[f64]) -> Option<&[f64]> {
        if !self.active(iter) {
            return None;
        }
        match self
            .strategy
            .compute(&self.memory, residual, &mut self.direction)
        {
            Ok(()) => Some(&self.direction),
            Err(DirectionFailure::EmptyMemory) => None,
            Err(DirectionFailure::IllConditioned) => {
                self.restart.observe_ill_conditioning();
                self.restart_now();
                None
            }
        }
    }

    /// Whether the strategy takes a single unit-step attempt instead of
    /// backtracking.
    pub fn single_attempt(&self) -> bool {
        self.strategy.single_attempt()
    }

    /// Backtracking schedule for the current strategy.
    pub fn step_lengths(&self) -> impl Iterator<Item = f64> {
        self.guard.step_lengths(self.strategy.single_attempt())
    }

    /// Safeguard test for a trial residual norm.
    pub fn accepts(&self, trial_norm: f64, current_norm: f64) -> bool {
        self.guard.accepts(trial_norm, current_norm)
    }

    /// Record the outcome of an accelerated candidate. Returns true when
    /// the rejection triggered a restart.
    pub fn record_outcome(&mut self, accepted: bool) -> bool {
        if accepted {
            self.guard.spend();
            self.restart.observe_acceptance();
            false
        } else if self.restart.observe_rejection() {
            self.restart_now();
            true
        } else {
            false
        }
    }

    /// Append a secant pair from the step actually taken.
    pub fn record_pair(&mut self, dw: Vec<f64>, dr: Vec<f64>) {
        self.memory.push(dw, dr);
    }

    /// Current history length.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Restarts triggered so far.
    pub fn restarts(&self) -> usize {
        self.restart.restarts()
    }

    fn restart_now(&mut self) {
        self.memory.clear();
        self.guard.reset_allowance(self.initial_norm);
    }
}
