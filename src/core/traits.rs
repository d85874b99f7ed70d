//! Core linear-algebra traits for fenox.

use crate::error::NoxError;
use crate::matrix::sparse::CsrMatrix;

/// Operator action y ← A x.
///
/// Implemented by assembled Jacobians and by the matrix-free finite-difference operator. The action
/// is fallible because a matrix-free product evaluates the residual, which calls back into assembly.
pub trait LinearOperator<T> {
    /// Number of rows (and columns; every operator here is square).
    fn nrows(&self) -> usize;
    /// Compute y = A · x.
    fn matvec(&self, x: &[T], y: &mut [T]) -> Result<(), NoxError>;
    /// The assembled matrix behind this operator, if there is one.
    fn as_csr(&self) -> Option<&CsrMatrix<T>> {
        None
    }
}
