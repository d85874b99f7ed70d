//! Preconditioners for the Newton linear solves.
//!
//! [`Preconditioner`] is the operator seen by a Krylov method (z = M⁻¹ r). [`Precond`] is the
//! lifecycle of a preconditioner built from an assembled Jacobian: `create` takes a snapshot of the
//! matrix, `compute` does the expensive setup, `operator` exposes the result. User-supplied
//! preconditioners attached to a problem implement `Precond`; the named kinds "Ifpack" and "ML"
//! map to [`Ilu0`] and [`Amg`].

use crate::error::NoxError;
use crate::matrix::sparse::CsrMatrix;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<T> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<(), NoxError>;
}

/// A preconditioner rebuilt from a Jacobian.
pub trait Precond<T>: Preconditioner<T> {
    /// Take what is needed from the current Jacobian.
    fn create(&mut self, jac: &CsrMatrix<T>) -> Result<(), NoxError>;
    /// Factorize / build the hierarchy from the last `create`.
    fn compute(&mut self) -> Result<(), NoxError> {
        Ok(())
    }
    /// The operator handed to the linear solver.
    fn operator(&self) -> &dyn Preconditioner<T>;
}

pub mod amg;
pub mod ilu;
pub mod jacobi;

pub use amg::Amg;
pub use ilu::Ilu0;
pub use jacobi::Jacobi;

/// Preconditioner kinds selectable by name.
pub use crate::context::pc_context::PreconditionerKind;
