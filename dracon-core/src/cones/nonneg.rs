//! Nonnegative orthant cone.
//!
//! Self-dual; the projection clips each coordinate at zero.

use super::traits::ConeProjection;

/// Nonnegative orthant ℝ₊^n.
#[derive(Debug, Clone)]
pub struct NonNegCone {
    dim: usize,
}

impl NonNegCone {
    /// Create a new nonnegative cone of the given dimension
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "NonNeg cone must have positive dimension");
        Self { dim }
    }
}

impl ConeProjection for NonNegCone {
    fn dim(&self) -> usize {
        self.dim
    }

    fn project(&self, v: &[f64], out: &mut [f64]) {
        for (o, &vi) in out.iter_mut().zip(v.iter()) {
            *o = vi.max(0.0);
        }
    }
}
