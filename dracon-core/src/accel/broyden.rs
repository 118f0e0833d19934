//! Restarted limited-memory Broyden directions.
//!
//! Maintains an implicit inverse Jacobian approximation H of the
//! fixed-point residual map via the "good" Broyden product form,
//! rebuilt from the stored secant pairs on every call:
//!
//! ```text
//! H_0 = I
//! H_i = H_{i-1} + (s_i - H_{i-1} y_i) s_i^T H_{i-1} / (s_i^T H_{i-1} y_i)
//! ```
//!
//! so applying H_i to a vector only needs the rank-one correction
//! vectors u_i = (s_i - H_{i-1} y_i) / (s_i^T H_{i-1} y_i). The
//! candidate direction is d = -H R. A collapsing denominator means the
//! approximation is numerically rank-deficient; the caller restarts the
//! history rather than trusting the direction.

use super::memory::DirectionMemory;
use crate::linalg::sparse;

const DENOM_TOL: f64 = 1e-10;

/// Product-form Broyden direction builder with reusable scratch.
#[derive(Debug, Default)]
pub struct BroydenDirection {
    // u_i correction vectors, one per stored pair
    us: Vec<Vec<f64>>,
    hy: Vec<f64>,
}

/// Why a direction could not be produced this iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionFailure {
    /// No history to work from; not an error, the step degrades to the
    /// baseline update
    EmptyMemory,

    /// The secant system is numerically degenerate; the history should
    /// be restarted
    IllConditioned,
}

impl BroydenDirection {
    /// Create a builder for vectors of length `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            us: Vec::new(),
            hy: vec![0.0; dim],
        }
    }

    /// Compute d = -H R into `out` from the current history.
    pub fn compute(
        &mut self,
        memory: &DirectionMemory,
        residual: &[f64],
        out: &mut [f64],
    ) -> Result<(), DirectionFailure> {
        if memory.is_empty() {
            return Err(DirectionFailure::EmptyMemory);
        }

        self.us.clear();
        for pair in memory.iter() {
            // hy = H_{i-1} y_i using the corrections built so far
            self.hy.copy_from_slice(&pair.dr);
            for (u, p) in self.us.iter().zip(memory.iter()) {
                let coeff = sparse::dot(&p.dw, &self.hy);
                sparse::axpy(coeff, u, &mut self.hy);
            }

            let denom = sparse::dot(&pair.dw, &self.hy);
            let scale = sparse::norm2(&pair.dw) * sparse::norm2(&self.hy);
            if denom.abs() <= DENOM_TOL * scale.max(f64::MIN_POSITIVE) {
                return Err(DirectionFailure::IllConditioned);
            }

            let mut u = vec![0.0; self.hy.len()];
            sparse::sub(&pair.dw, &self.hy, &mut u);
            for ui in u.iter_mut() {
                *ui /= denom;
            }
            self.us.push(u);
        }

        // d = -H R, applying the corrections in insertion order
        for (o, &ri) in out.iter_mut().zip(residual.iter()) {
            *o = -ri;
        }
        // t = H R computed on -R directly: H is linear, so apply the
        // corrections to the negated residual
        for (u, p) in self.us.iter().zip(memory.iter()) {
            let coeff = sparse::dot(&p.dw, out);
            sparse::axpy(coeff, u, out);
        }

        if out.iter().any(|v| !v.is_finite()) {
            return Err(DirectionFailure::IllConditioned);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_memory_unavailable() {
        let mut broyden = BroydenDirection::new(2);
        let mem = DirectionMemory::new(4, 2);
        let mut d = vec![0.0; 2];
        assert_eq!(
            broyden.compute(&mem, &[1.0, 1.0], &mut d),
            Err(DirectionFailure::EmptyMemory)
        );
    }

    #[test]
    fn test_single_pair_satisfies_secant() {
        // With one pair, H y = s must hold exactly, so feeding R = y
        // gives d = -H y = -s.
        let mut broyden = BroydenDirection::new(3);
        let mut mem = DirectionMemory::new(4, 3);
        let s = vec![1.0, 2.0, -1.0];
        let y = vec![0.5, -0.5, 1.0];
        mem.push(s.clone(), y.clone());

        let mut d = vec![0.0; 3];
        broyden.compute(&mem, &y, &mut d).unwrap();
        for (di, si) in d.iter().zip(s.iter()) {
            assert_relative_eq!(*di, -si, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_latest_secant_pair_holds_with_history() {
        // After all updates, the newest pair still satisfies H y = s.
        let mut broyden = BroydenDirection::new(2);
        let mut mem = DirectionMemory::new(4, 2);
        mem.push(vec![1.0, 0.0], vec![2.0, 0.5]);
        mem.push(vec![0.0, 1.0], vec![-0.5, 1.5]);

        let mut d = vec![0.0; 2];
        broyden.compute(&mem, &[-0.5, 1.5], &mut d).unwrap();
        assert_relative_eq!(d[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(d[1], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_pair_reports_ill_conditioned() {
        // s orthogonal to H y (here H = I and s ⟂ y)
        let mut broyden = BroydenDirection::new(2);
        let mut mem = DirectionMemory::new(4, 2);
        mem.push(vec![1.0, 0.0], vec![0.0, 1.0]);

        let mut d = vec![0.0; 2];
        assert_eq!(
            broyden.compute(&mem, &[1.0, 1.0], &mut d),
            Err(DirectionFailure::IllConditioned)
        );
    }
}
