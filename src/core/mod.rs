//! Scalar type, operator traits and vector kernels shared by every layer of fenox.

pub mod scalar;
pub mod traits;
pub mod wrappers;

pub use scalar::Scalar;
pub use traits::LinearOperator;
