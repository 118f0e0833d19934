//! Positive semidefinite cone.
//!
//! Stored in svec format with sqrt(2) scaling on off-diagonals, so the
//! Euclidean inner product on packed vectors matches the Frobenius inner
//! product on matrices. The projection clips negative eigenvalues at zero.

use super::traits::ConeProjection;
use nalgebra::linalg::SymmetricEigen;
use nalgebra::DMatrix;

/// PSD cone over n×n symmetric matrices, packed dimension n(n+1)/2.
#[derive(Debug, Clone)]
pub struct PsdCone {
    n: usize,
}

impl PsdCone {
    /// Create a new PSD cone for n×n matrices
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "PSD cone must have positive size");
        Self { n }
    }

    /// Matrix side length n
    pub fn size(&self) -> usize {
        self.n
    }
}

const SQRT2: f64 = std::f64::consts::SQRT_2;

/// Unpack an svec slice into a full symmetric matrix.
///
/// svec stores the upper triangle column by column with off-diagonal
/// entries scaled by sqrt(2).
pub(crate) fn svec_to_mat(s: &[f64], n: usize) -> DMatrix<f64> {
    let mut x = DMatrix::<f64>::zeros(n, n);
    let mut idx = 0;
    for col in 0..n {
        for row in 0..=col {
            if row == col {
                x[(row, col)] = s[idx];
            } else {
                let v = s[idx] / SQRT2;
                x[(row, col)] = v;
                x[(col, row)] = v;
            }
            idx += 1;
        }
    }
    x
}

/// Pack a symmetric matrix into svec form.
pub(crate) fn mat_to_svec(x: &DMatrix<f64>, out: &mut [f64]) {
    let n = x.nrows();
    let mut idx = 0;
    for col in 0..n {
        for row in 0..=col {
            out[idx] = if row == col {
                x[(row, col)]
            } else {
                SQRT2 * x[(row, col)]
            };
            idx += 1;
        }
    }
}

impl ConeProjection for PsdCone {
    fn dim(&self) -> usize {
        self.n * (self.n + 1) / 2
    }

    fn project(&self, v: &[f64], out: &mut [f64]) {
        if self.n == 1 {
            out[0] = v[0].max(0.0);
            return;
        }

        let x = svec_to_mat(v, self.n);
        let eig = SymmetricEigen::new(x);

        // Reassemble from the nonnegative part of the spectrum
        let mut proj = DMatrix::<f64>::zeros(self.n, self.n);
        for (k, &lam) in eig.eigenvalues.iter().enumerate() {
            if lam > 0.0 {
                let q = eig.eigenvectors.column(k);
                for i in 0..self.n {
                    for j in 0..self.n {
                        proj[(i, j)] += lam * q[i] * q[j];
                    }
                }
            }
        }

        mat_to_svec(&proj, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_svec_roundtrip() {
        let s = [1.0, 0.5, 2.0, -0.3, 0.7, 3.0];
        let x = svec_to_mat(&s, 3);
        let mut back = [0.0; 6];
        mat_to_svec(&x, &mut back);
        for (a, b) in s.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_psd_already_positive() {
        // diag(1, 2) in svec: [1, 0, 2]
        let cone = PsdCone::new(2);
        let v = [1.0, 0.0, 2.0];
        let mut out = [0.0; 3];
        cone.project(&v, &mut out);
        for (a, b) in v.iter().zip(out.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_psd_clips_negative_eigenvalue() {
        // diag(1, -1) in svec: [1, 0, -1] projects to diag(1, 0)
        let cone = PsdCone::new(2);
        let v = [1.0, 0.0, -1.0];
        let mut out = [0.0; 3];
        cone.project(&v, &mut out);
        assert_relative_eq!(out[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(out[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_psd_projection_optimality() {
        // General symmetric matrix; verify p ⪰ 0 and <p, v - p> = 0
        let cone = PsdCone::new(3);
        let v = [0.8, -1.3, 0.4, 0.9, -2.0, -0.6];
        let mut p = [0.0; 6];
        cone.project(&v, &mut p);

        let pm = svec_to_mat(&p, 3);
        let eig = SymmetricEigen::new(pm);
        let min_eig = eig.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(min_eig > -1e-10, "projection not PSD: min eig {}", min_eig);

        let inner: f64 = p.iter().zip(v.iter()).map(|(&pi, &vi)| pi * (vi - pi)).sum();
        assert_relative_eq!(inner, 0.0, epsilon = 1e-10);
    }
}
