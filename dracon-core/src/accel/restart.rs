//! Restart policy for the direction history.
//!
//! A stale or misleading secant history shows up as a run of safeguard
//! rejections, or directly as an ill-conditioned direction solve. Either
//! way the cure is the same: drop the history and refill the safeguard
//! allowance, returning the engine to its warm-up behavior.

/// Tracks consecutive rejections and ill-conditioning signals.
#[derive(Debug)]
pub struct RestartController {
    rejection_limit: usize,
    consecutive_rejections: usize,
    restarts: usize,
}

impl RestartController {
    /// Create a controller that restarts after `rejection_limit`
    /// consecutive rejections.
    pub fn new(rejection_limit: usize) -> Self {
        assert!(rejection_limit > 0);
        Self {
            rejection_limit,
            consecutive_rejections: 0,
            restarts: 0,
        }
    }

    /// Record an accepted accelerated step.
    pub fn observe_acceptance(&mut self) {
        self.consecutive_rejections = 0;
    }

    /// Record a rejected candidate; returns true when the history
    /// should be restarted.
    pub fn observe_rejection(&mut self) -> bool {
        self.consecutive_rejections += 1;
        if self.consecutive_rejections >= self.rejection_limit {
            self.trigger();
            true
        } else {
            false
        }
    }

    /// Record an ill-conditioned direction solve, which restarts
    /// unconditionally.
    pub fn observe_ill_conditioning(&mut self) {
        self.trigger();
    }

    fn trigger(&mut self) {
        self.consecutive_rejections = 0;
        self.restarts += 1;
    }

    /// Number of restarts triggered so far.
    pub fn restarts(&self) -> usize {
        self.restarts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_after_consecutive_rejections() {
        let mut ctrl = RestartController::new(3);
        assert!(!ctrl.observe_rejection());
        assert!(!ctrl.observe_rejection());
        assert!(ctrl.observe_rejection());
        assert_eq!(ctrl.restarts(), 1);

        // Counter reset after the trigger
        assert!(!ctrl.observe_rejection());
    }

    #[test]
    fn test_acceptance_resets_streak() {
        let mut ctrl = RestartController::new(2);
        assert!(!ctrl.observe_rejection());
        ctrl.observe_acceptance();
        assert!(!ctrl.observe_rejection());
        assert!(ctrl.observe_rejection());
        assert_eq!(ctrl.restarts(), 1);
    }

    #[test]
    fn test_ill_conditioning_restarts_immediately() {
        let mut ctrl = RestartController::new(10);
        ctrl.observe_ill_conditioning();
        assert_eq!(ctrl.restarts(), 1);
    }
}
