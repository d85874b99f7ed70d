//! Matrix module: coefficient vectors and the fixed-pattern sparse Jacobian.

pub mod sparse;
pub mod vector;

pub use sparse::{CsrMatrix, JacobianStructure, PatternBuilder};
pub use vector::CoeffVector;
