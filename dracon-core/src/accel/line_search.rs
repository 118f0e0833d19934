//! Safeguarded line search policy.
//!
//! An accelerated candidate w + τ d is accepted when the residual norm
//! at the trial point satisfies
//!
//! ```text
//! ||R(w + τ d)|| <= c * ||R(w)|| + δ
//! ```
//!
//! with contraction factor c < 1 and a slack δ drawn from a finite
//! allowance. The allowance starts at `budget * ||R(w0)||` and is spent
//! geometrically: each acceptance offers a (1 - q) fraction of what
//! remains and then keeps the q fraction, so the total slack handed out
//! over the whole solve is bounded by the initial budget. That summable
//! slack is what lets early non-monotone accelerated steps through
//! without giving up convergence of the safeguarded iteration.
//!
//! This type only decides accept/reject and step lengths; applying the
//! operator at trial points stays with the caller, which owns the
//! iteration's application count.

/// Allowance-based acceptance policy and backtracking schedule.
#[derive(Debug)]
pub struct LineSearchGuard {
    contraction: f64,
    shrink: f64,
    max_steps: usize,
    decay: f64,
    budget_factor: f64,
    remaining: f64,
}

impl LineSearchGuard {
    /// Create the guard from solver settings values.
    pub fn new(
        contraction: f64,
        shrink: f64,
        max_steps: usize,
        decay: f64,
        budget_factor: f64,
    ) -> Self {
        Self {
            contraction,
            shrink,
            max_steps,
            decay,
            budget_factor,
            remaining: 0.0,
        }
    }

    /// Arm the allowance from the initial residual norm. Also used by
    /// the restart policy to refill it.
    pub fn reset_allowance(&mut self, initial_residual_norm: f64) {
        self.remaining = self.budget_factor * initial_residual_norm;
    }

    /// Acceptance threshold for the current residual norm.
    pub fn threshold(&self, residual_norm: f64) -> f64 {
        self.contraction * residual_norm + (1.0 - self.decay) * self.remaining
    }

    /// Whether a trial residual norm passes the safeguard.
    pub fn accepts(&self, trial_norm: f64, residual_norm: f64) -> bool {
        trial_norm.is_finite() && trial_norm <= self.threshold(residual_norm)
    }

    /// Consume the offered slack after an acceptance.
    pub fn spend(&mut self) {
        self.remaining *= self.decay;
    }

    /// Backtracking step lengths 1, β, β², ... capped at the attempt
    /// budget (or a single unit step when `single_attempt` is set).
    pub fn step_lengths(&self, single_attempt: bool) -> impl Iterator<Item = f64> {
        let count = if single_attempt { 1 } else { self.max_steps };
        let shrink = self.shrink;
        (0..count).scan(1.0, move |tau, _| {
            let current = *tau;
            *tau *= shrink;
            Some(current)
        })
    }
}
