//! Zero cone: equality constraints.
//!
//! The zero cone K = {0}^n represents equality constraints in the
//! optimization problem. Its dual is all of ℝ^n, so the dual projection
//! is the identity, which is the kernel that actually appears in the
//! splitting iteration.

use super::traits::ConeProjection;

/// Zero cone for equality constraints.
#[derive(Debug, Clone)]
pub struct ZeroCone {
    /// Dimension of the zero cone
    dim: usize,
}

impl ZeroCone {
    /// Create a new zero cone of the given dimension
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "Zero cone must have positive dimension");
        Self { dim }
    }
}

impl ConeProjection for ZeroCone {
    fn dim(&self) -> usize {
        self.dim
    }

    fn project(&self, _v: &[f64], out: &mut [f64]) {
        out.fill(0.0);
    }

    fn project_dual(&self, v: &[f64], out: &mut [f64]) {
        // Dual of {0}^n is ℝ^n
        out.copy_from_slice(v);
    }
}
