//! Exponential cone.
//!
//! K = closure{(x, y, z) : y > 0, y exp(x/y) ≤ z}, plus the ray
//! {(x, 0, z) : x ≤ 0, z ≥ 0}. Not self-dual; the dual cone is
//! K* = closure{(u, v, w) : u < 0, -u exp(v/u) ≤ e w} ∪ {(0, v, w) : v, w ≥ 0}.
//!
//! The projection has no closed form. Easy cases (point in the cone, point
//! in the polar cone, both leading components nonpositive) are handled
//! directly; the remaining case reduces to a univariate search over the
//! boundary slope ρ = x/y, since for fixed ρ the optimal height y has a
//! closed form. The search is a coarse scan refined by golden-section,
//! which is slower than a tuned Newton iteration but unconditionally
//! convergent and deterministic.

use super::traits::ConeProjection;

/// Product of `count` three-dimensional exponential cones.
#[derive(Debug, Clone)]
pub struct ExpCone {
    count: usize,
}

impl ExpCone {
    /// Create a product of `count` 3D exponential cone blocks
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "Exp cone must have positive count");
        Self { count }
    }
}

const FEAS_TOL: f64 = 1e-12;

/// Membership test for the primal exponential cone (with tolerance).
fn in_cone(r: f64, s: f64, t: f64) -> bool {
    let scale = r.abs().max(s.abs()).max(t.abs()).max(1.0);
    let tol = FEAS_TOL * scale;
    if s > 0.0 {
        // s * exp(r/s) <= t; the exp may overflow to +inf, which correctly
        // fails the comparison
        s * (r / s).exp() <= t + tol
    } else {
        s >= -tol && r <= tol && t >= -tol
    }
}

/// Membership test for the dual exponential cone (with tolerance).
fn in_dual_cone(u: f64, v: f64, w: f64) -> bool {
    let scale = u.abs().max(v.abs()).max(w.abs()).max(1.0);
    let tol = FEAS_TOL * scale;
    if u < 0.0 {
        -u * (v / u).exp() <= std::f64::consts::E * w + tol
    } else {
        u <= tol && v >= -tol && w >= -tol
    }
}

/// Optimal boundary height for slope ρ: minimizes
/// ||(yρ, y, y e^ρ) − (r, s, t)||² over y ≥ 0, which is quadratic in y.
fn height_for_slope(rho: f64, r: f64, s: f64, t: f64) -> f64 {
    let e = rho.exp();
    let denom = rho * rho + 1.0 + e * e;
    ((rho * r + s + e * t) / denom).max(0.0)
}

/// Squared distance from v to the boundary point with slope ρ.
fn boundary_dist2(rho: f64, r: f64, s: f64, t: f64) -> f64 {
    let y = height_for_slope(rho, r, s, t);
    let e = rho.exp();
    let dx = y * rho - r;
    let dy = y - s;
    let dz = y * e - t;
    dx * dx + dy * dy + dz * dz
}

/// Project a single 3D block onto the exponential cone.
fn project_block(v: &[f64], out: &mut [f64]) {
    let (r, s, t) = (v[0], v[1], v[2]);

    if in_cone(r, s, t) {
        out.copy_from_slice(v);
        return;
    }

    // Point in the polar cone K° = -K*: projection is the origin
    if in_dual_cone(-r, -s, -t) {
        out.fill(0.0);
        return;
    }

    // Heuristic candidate on the flat ray {(x, 0, z) : x <= 0, z >= 0}
    let ray = [r.min(0.0), 0.0, t.max(0.0)];
    let ray_dist2 = {
        let dx = ray[0] - r;
        let dz = ray[2] - t;
        dx * dx + s * s + dz * dz
    };

    if r <= 0.0 && s <= 0.0 {
        out.copy_from_slice(&ray);
        return;
    }

    // Curved-boundary case: scan the slope, widening the window if the
    // minimizer sits on its edge, then refine by golden-section.
    let mut lo = -20.0;
    let mut hi = 20.0;
    let (mut best_rho, mut best_d) = (0.0, f64::INFINITY);
    loop {
        let steps = 160;
        let h = (hi - lo) / steps as f64;
        for i in 0..=steps {
            let rho = lo + h * i as f64;
            let d = boundary_dist2(rho, r, s, t);
            if d < best_d {
                best_d = d;
                best_rho = rho;
            }
        }
        let on_edge = best_rho <= lo + h || best_rho >= hi - h;
        if !on_edge || hi >= 60.0 {
            break;
        }
        lo *= 3.0;
        hi *= 3.0;
        lo = lo.max(-60.0);
        hi = hi.min(60.0);
    }

    // Golden-section refinement around the grid minimizer
    let gr = 0.5 * (5f64.sqrt() - 1.0);
    let width = (hi - lo) / 160.0;
    let mut a = best_rho - width;
    let mut b = best_rho + width;
    let mut c = b - gr * (b - a);
    let mut d = a + gr * (b - a);
    let mut fc = boundary_dist2(c, r, s, t);
    let mut fd = boundary_dist2(d, r, s, t);
    for _ in 0..120 {
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - gr * (b - a);
            fc = boundary_dist2(c, r, s, t);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + gr * (b - a);
            fd = boundary_dist2(d, r, s, t);
        }
        if b - a < 1e-14 * (1.0 + best_rho.abs()) {
            break;
        }
    }
    let rho = 0.5 * (a + b);
    let y = height_for_slope(rho, r, s, t);
    let curved = [y * rho, y, y * rho.exp()];
    let curved_dist2 = boundary_dist2(rho, r, s, t);

    if ray_dist2 < curved_dist2 {
        out.copy_from_slice(&ray);
    } else {
        out.copy_from_slice(&curved);
    }
}

impl ConeProjection for ExpCone {
    fn dim(&self) -> usize {
        3 * self.count
    }

    fn project(&self, v: &[f64], out: &mut [f64]) {
        for k in 0..self.count {
            let i = 3 * k;
            project_block(&v[i..i + 3], &mut out[i..i + 3]);
        }
    }

    fn project_dual(&self, v: &[f64], out: &mut [f64]) {
        // Moreau: Π_{K*}(v) = v + Π_K(−v)
        for k in 0..self.count {
            let i = 3 * k;
            let neg = [-v[i], -v[i + 1], -v[i + 2]];
            let mut p = [0.0; 3];
            project_block(&neg, &mut p);
            out[i] = v[i] + p[0];
            out[i + 1] = v[i + 1] + p[1];
            out[i + 2] = v[i + 2] + p[2];
        }
    }
}
