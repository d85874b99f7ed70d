// Jacobi preconditioner implementation

use crate::core::scalar::Scalar;
use crate::error::NoxError;
use crate::matrix::sparse::CsrMatrix;
use crate::preconditioner::{Precond, Preconditioner};

/// Jacobi preconditioner: M⁻¹ = D⁻¹
#[derive(Debug, Clone)]
pub struct Jacobi<T> {
    pub(crate) inv_diag: Vec<T>,
}

impl<T: Scalar> Jacobi<T> {
    /// new with empty state; user must call `create`.
    pub fn new() -> Self {
        Self { inv_diag: Vec::new() }
    }

    /// Inverse of `diag`, zero where the diagonal vanishes.
    pub(crate) fn invert(diag: &[T]) -> Vec<T> {
        diag.iter()
            .map(|&d| if d != T::zero() { T::one() / d } else { T::zero() })
            .collect()
    }
}

impl<T: Scalar> Default for Jacobi<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Preconditioner<T> for Jacobi<T> {
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<(), NoxError> {
        if r.len() != self.inv_diag.len() {
            return Err(NoxError::DimensionMismatch { expected: self.inv_diag.len(), found: r.len() });
        }
        for ((zi, ri), di) in z.iter_mut().zip(r).zip(&self.inv_diag) {
            *zi = *di * *ri;
        }
        Ok(())
    }
}

impl<T: Scalar> Precond<T> for Jacobi<T> {
    fn create(&mut self, jac: &CsrMatrix<T>) -> Result<(), NoxError> {
        self.inv_diag = Self::invert(&jac.diagonal());
        Ok(())
    }

    fn operator(&self) -> &dyn Preconditioner<T> {
        self
    }
}
