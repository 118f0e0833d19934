//! Second-order (Lorentz) cone.
//!
//! K = {(t, x) ∈ ℝ × ℝ^{d-1} : t ≥ ||x||₂}, self-dual. The projection has
//! the classical closed form with three cases (inside, polar, boundary
//! blend).

use super::traits::ConeProjection;

/// Second-order cone of total dimension `dim` (first coordinate is the
/// radius component t).
#[derive(Debug, Clone)]
pub struct SocCone {
    dim: usize,
}

impl SocCone {
    /// Create a new SOC of the given total dimension (must be >= 2)
    pub fn new(dim: usize) -> Self {
        assert!(dim >= 2, "SOC cone must have dimension >= 2");
        Self { dim }
    }
}

impl ConeProjection for SocCone {
    fn dim(&self) -> usize {
        self.dim
    }

    fn project(&self, v: &[f64], out: &mut [f64]) {
        let t = v[0];
        let x_norm = v[1..].iter().map(|&x| x * x).sum::<f64>().sqrt();

        if x_norm <= t {
            // Inside the cone
            out.copy_from_slice(v);
        } else if x_norm <= -t {
            // Inside the polar cone: projection is the origin
            out.fill(0.0);
        } else {
            // Boundary case: scale onto the cone surface
            let alpha = 0.5 * (t + x_norm);
            out[0] = alpha;
            // x_norm > 0 here since x_norm > t >= -x_norm failed only if
            // x_norm > 0
            let scale = alpha / x_norm;
            for (o, &xi) in out[1..].iter_mut().zip(v[1..].iter()) {
                *o = scale * xi;
            }
        }
    }
}
