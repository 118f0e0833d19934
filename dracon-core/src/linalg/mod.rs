//! Linear algebra: sparse kernels, factorization, and the embedding
//! system solvers.

pub mod cg;
pub mod kkt;
pub mod ldl;
pub mod sparse;

pub use cg::{CgError, CgSolver};
pub use kkt::{DirectKkt, IndirectKkt, KktError, KktSolver};
pub use ldl::{LdlError, LdlFactorization};
pub use sparse::SparseCsc;
