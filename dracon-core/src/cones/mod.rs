//! Cone projection kernels.
//!
//! Each supported cone implements [`ConeProjection`]; a problem's cone
//! K is the Cartesian product of the blocks listed in its
//! [`ConeSpec`](crate::problem::ConeSpec) slice, and [`ProductCone`]
//! applies the block kernels in order.

pub mod exp;
pub mod nonneg;
pub mod psd;
pub mod soc;
pub mod traits;
pub mod zero;

pub use exp::ExpCone;
pub use nonneg::NonNegCone;
pub use psd::PsdCone;
pub use soc::SocCone;
pub use traits::ConeProjection;
pub use zero::ZeroCone;

use crate::problem::ConeSpec;

/// Cartesian product of cone blocks, projected blockwise.
pub struct ProductCone {
    blocks: Vec<Box<dyn ConeProjection>>,
    dim: usize,
}

impl ProductCone {
    /// Build the product cone from a problem's cone list.
    pub fn from_specs(specs: &[ConeSpec]) -> Self {
        let blocks: Vec<Box<dyn ConeProjection>> = specs
            .iter()
            .map(|spec| -> Box<dyn ConeProjection> {
                match *spec {
                    ConeSpec::Zero { dim } => Box::new(ZeroCone::new(dim)),
                    ConeSpec::NonNeg { dim } => Box::new(NonNegCone::new(dim)),
                    ConeSpec::Soc { dim } => Box::new(SocCone::new(dim)),
                    ConeSpec::Psd { n } => Box::new(PsdCone::new(n)),
                    ConeSpec::Exp { count } => Box::new(ExpCone::new(count)),
                }
            })
            .collect();
        let dim = blocks.iter().map(|b| b.dim()).sum();
        Self { blocks, dim }
    }
}

impl ConeProjection for ProductCone {
    fn dim(&self) -> usize {
        self.dim
    }

    fn project(&self, v: &[f64], out: &mut [f64]) {
        let mut offset = 0;
        for block in &self.blocks {
            let d = block.dim();
            block.project(&v[offset..offset + d], &mut out[offset..offset + d]);
            offset += d;
        }
    }

    fn project_dual(&self, v: &[f64], out: &mut [f64]) {
        let mut offset = 0;
        for block in &self.blocks {
            let d = block.dim();
            block.project_dual(&v[offset..offset + d], &mut out[offset..offset + d]);
            offset += d;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_cone_blockwise() {
        let specs = [ConeSpec::Zero { dim: 2 }, ConeSpec::NonNeg { dim: 3 }];
        let cone = ProductCone::from_specs(&specs);
        assert_eq!(cone.dim(), 5);

        let v = [1.0, -1.0, 0.5, -0.5, 2.0];
        let mut out = [f64::NAN; 5];
        cone.project(&v, &mut out);
        assert_eq!(out, [0.0, 0.0, 0.5, 0.0, 2.0]);

        // Dual: zero block passes through, orthant is self-dual
        cone.project_dual(&v, &mut out);
        assert_eq!(out, [1.0, -1.0, 0.5, 0.0, 2.0]);
    }

    #[test]
    fn test_product_cone_mixed_dims() {
        let specs = [
            ConeSpec::NonNeg { dim: 1 },
            ConeSpec::Soc { dim: 3 },
            ConeSpec::Psd { n: 2 },
        ];
        let cone = ProductCone::from_specs(&specs);
        assert_eq!(cone.dim(), 1 + 3 + 3);
    }
}
