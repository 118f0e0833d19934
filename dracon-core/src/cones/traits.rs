//! Cone projection trait definition.
//!
//! This module defines the interface every cone implementation must satisfy.
//! The splitting iteration only needs Euclidean projections, not barriers:
//! one projection onto the dual cone K* per iteration, applied blockwise to
//! contiguous slices of the global dual vector.

/// Euclidean projection onto a convex cone and its dual.
///
/// All cone types (Zero, NonNeg, SOC, PSD, EXP) implement this trait. The
/// methods operate on contiguous slices of the global m-dimensional vector;
/// each kernel is responsible for a specific range `[offset .. offset+dim]`.
///
/// # Contract
///
/// `project` writes the Euclidean projection of `v` onto K into `out`. The
/// result must satisfy the projection optimality conditions
///
/// ```text
/// p ∈ K,   v − p ∈ K° (polar cone),   ⟨p, v − p⟩ = 0
/// ```
///
/// up to floating-point accuracy. Implementations must be deterministic and
/// tolerate arbitrary finite input (points inside the cone, in the polar
/// cone, or anywhere else). Non-finite output indicates a kernel failure and
/// is fatal to the solve.
pub trait ConeProjection: Send + Sync {
    /// Dimension of this cone block in the m-dimensional space.
    fn dim(&self) -> usize;

    /// Project `v` onto the primal cone K, writing the result to `out`.
    ///
    /// # Requirements
    ///
    /// - `v.len() == out.len() == self.dim()`
    fn project(&self, v: &[f64], out: &mut [f64]);

    /// Project `v` onto the dual cone K*.
    ///
    /// For self-dual cones (NonNeg, SOC, PSD) the default forwarding to the
    /// primal projection is correct. Non-self-dual cones (Zero, EXP)
    /// override this; the Moreau decomposition `Π_{K*}(v) = v + Π_K(−v)`
    /// gives the dual projection from the primal one.
    fn project_dual(&self, v: &[f64], out: &mut [f64]) {
        self.project(v, out);
    }
}
