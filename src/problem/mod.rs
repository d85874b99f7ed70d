//! Finite-element problems as seen by the Newton solver.
//!
//! A [`FeProblem`] owns the discretization. It knows its DOF count, declares which Jacobian entries
//! may be nonzero, and assembles either the residual F(x) or the Jacobian J(x) for a coefficient
//! array. [`interface::ProblemInterface`] wraps a problem and exposes the narrow residual, Jacobian
//! and preconditioner capabilities the nonlinear solver calls back into.

use crate::core::Scalar;
use crate::error::NoxError;
use crate::matrix::{CsrMatrix, PatternBuilder};

pub mod interface;

pub use interface::{
    CallCounters, FeResidual, JacobianInterface, PreconditionerInterface, ProblemInterface, ResidualInterface,
};

/// Where an assembly pass writes its result.
///
/// The target is zeroed by the caller before `assemble` is invoked, so the problem only adds
/// contributions.
#[derive(Debug)]
pub enum AssemblyTarget<'a, T> {
    /// Add entries of J(x) into the preallocated pattern.
    Jacobian(&'a mut CsrMatrix<T>),
    /// Add entries of F(x).
    Residual(&'a mut [T]),
}

/// The assembly capability the solver needs from a discretized problem.
pub trait FeProblem<T: Scalar> {
    /// Current number of degrees of freedom.
    fn num_dofs(&self) -> usize;

    /// True if the Jacobian is never assembled (Jacobian-free Newton–Krylov).
    fn is_matrix_free(&self) -> bool {
        false
    }

    /// Assemble F(x) or J(x) for the coefficient array `coeffs` into `target`.
    fn assemble(&mut self, coeffs: &[T], target: AssemblyTarget<'_, T>) -> Result<(), NoxError>;

    /// Declare every (row, col) that the Jacobian may ever touch.
    fn create_jacobian_structure(&mut self, pattern: &mut PatternBuilder);

    /// Drop any cached matrix state; called when the solver is torn down.
    fn invalidate_matrix(&mut self) {}
}

impl<T: Scalar, P: FeProblem<T> + ?Sized> FeProblem<T> for &mut P {
    fn num_dofs(&self) -> usize {
        (**self).num_dofs()
    }

    fn is_matrix_free(&self) -> bool {
        (**self).is_matrix_free()
    }

    fn assemble(&mut self, coeffs: &[T], target: AssemblyTarget<'_, T>) -> Result<(), NoxError> {
        (**self).assemble(coeffs, target)
    }

    fn create_jacobian_structure(&mut self, pattern: &mut PatternBuilder) {
        (**self).create_jacobian_structure(pattern)
    }

    fn invalidate_matrix(&mut self) {
        (**self).invalidate_matrix()
    }
}
