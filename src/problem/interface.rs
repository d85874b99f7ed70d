//! Bridge between a finite-element problem and the Newton solver.
//!
//! [`ProblemInterface`] owns the problem, the initial guess, the preallocated Jacobian and an
//! optional user preconditioner. The nonlinear solver reaches it only through three narrow traits:
//! [`ResidualInterface`], [`JacobianInterface`] and [`PreconditionerInterface`].
//!
//! The Jacobian pattern is fixed once at preallocation; every later assembly writes values into
//! the same pattern.

use super::{AssemblyTarget, FeProblem};
use crate::core::Scalar;
use crate::error::NoxError;
use crate::matrix::{CoeffVector, CsrMatrix, PatternBuilder};
use crate::preconditioner::{Precond, Preconditioner};
use std::sync::Arc;

/// Evaluation of F(x).
pub trait ResidualInterface<T> {
    /// Overwrite `f` with F(x). `f` is zeroed before assembly.
    fn compute_f(&mut self, x: &[T], f: &mut [T]) -> Result<(), NoxError>;
}

/// Assembly of J(x) into the preallocated matrix.
pub trait JacobianInterface<T> {
    fn compute_jacobian(&mut self, x: &[T]) -> Result<(), NoxError>;
    /// The Jacobian as last assembled, if one was preallocated.
    fn jacobian(&self) -> Option<&CsrMatrix<T>>;
}

/// Construction of the attached user preconditioner at x.
pub trait PreconditionerInterface<T> {
    /// Assemble J(x), feed it to the attached preconditioner and return the ready operator.
    ///
    /// # Panics
    /// Panics if no preconditioner is attached.
    fn compute_preconditioner(&mut self, x: &[T]) -> Result<&dyn Preconditioner<T>, NoxError>;
}

/// Number of callbacks served, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounters {
    pub residual: usize,
    pub jacobian: usize,
    pub preconditioner: usize,
}

/// Residual-only view of a problem, borrowed out of the interface for matrix-free operators.
pub struct FeResidual<'a, T: Scalar, P: FeProblem<T>> {
    fep: &'a mut P,
    evaluations: &'a mut usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Scalar, P: FeProblem<T>> ResidualInterface<T> for FeResidual<'_, T, P> {
    fn compute_f(&mut self, x: &[T], f: &mut [T]) -> Result<(), NoxError> {
        assemble_residual(&mut *self.fep, x, f)?;
        *self.evaluations += 1;
        Ok(())
    }
}

fn assemble_residual<T: Scalar, P: FeProblem<T>>(fep: &mut P, x: &[T], f: &mut [T]) -> Result<(), NoxError> {
    let n = fep.num_dofs();
    if x.len() != n {
        return Err(NoxError::DimensionMismatch { expected: n, found: x.len() });
    }
    if f.len() != n {
        return Err(NoxError::DimensionMismatch { expected: n, found: f.len() });
    }
    f.iter_mut().for_each(|v| *v = T::zero());
    fep.assemble(x, AssemblyTarget::Residual(f))
}

pub struct ProblemInterface<T: Scalar, P: FeProblem<T>> {
    fep: P,
    init_sln: CoeffVector<T>,
    jacobian: Option<CsrMatrix<T>>,
    precond: Option<Box<dyn Precond<T>>>,
    counters: CallCounters,
}

impl<T: Scalar, P: FeProblem<T>> ProblemInterface<T, P> {
    /// Wrap `fep`. Unless the problem is matrix free the Jacobian is preallocated here.
    pub fn new(fep: P) -> Self {
        let ndof = fep.num_dofs();
        let mut iface = Self {
            fep,
            init_sln: CoeffVector::alloc(ndof),
            jacobian: None,
            precond: None,
            counters: CallCounters::default(),
        };
        if !iface.fep.is_matrix_free() {
            iface.prealloc_jacobian();
        }
        iface
    }

    /// Build the sparsity pattern from the problem and allocate a zeroed Jacobian on it.
    pub fn prealloc_jacobian(&mut self) {
        let n = self.fep.num_dofs();
        let mut pattern = PatternBuilder::new(n);
        self.fep.create_jacobian_structure(&mut pattern);
        let mut jac = CsrMatrix::new(Arc::new(pattern.build()));
        jac.finish();
        log::debug!("preallocated a {}x{} Jacobian with {} entries", n, n, jac.nnz());
        self.jacobian = Some(jac);
    }

    /// Attach a user preconditioner. Preallocates the Jacobian if that has not happened yet.
    pub fn attach_preconditioner(&mut self, pc: Box<dyn Precond<T>>) {
        if self.jacobian.is_none() {
            self.prealloc_jacobian();
        }
        self.precond = Some(pc);
    }

    pub fn has_preconditioner(&self) -> bool {
        self.precond.is_some()
    }

    /// The attached preconditioner's operator as of its last `compute`.
    pub fn precond_operator(&self) -> Option<&dyn Preconditioner<T>> {
        self.precond.as_deref().map(|pc| pc.operator())
    }

    /// Current DOF count of the wrapped problem.
    pub fn ndof(&self) -> usize {
        self.fep.num_dofs()
    }

    /// Copy `values` into the initial guess.
    ///
    /// # Panics
    /// Panics if `values.len()` differs from the problem's current DOF count.
    pub fn set_init_sln(&mut self, values: &[T]) {
        let n = self.fep.num_dofs();
        if self.init_sln.len() != n {
            self.init_sln = CoeffVector::alloc(n);
        }
        self.init_sln.copy_from(values);
    }

    pub fn init_sln(&self) -> &CoeffVector<T> {
        &self.init_sln
    }

    pub fn fep(&self) -> &P {
        &self.fep
    }

    pub fn fep_mut(&mut self) -> &mut P {
        &mut self.fep
    }

    pub fn counters(&self) -> CallCounters {
        self.counters
    }

    /// Split into a residual evaluator and the attached preconditioner's operator, so both can be
    /// used during one matrix-free linear solve.
    pub fn matrix_free_parts(&mut self) -> (FeResidual<'_, T, P>, Option<&dyn Preconditioner<T>>) {
        let residual = FeResidual {
            fep: &mut self.fep,
            evaluations: &mut self.counters.residual,
            _marker: std::marker::PhantomData,
        };
        (residual, self.precond.as_deref().map(|pc| pc.operator()))
    }
}

impl<T: Scalar, P: FeProblem<T>> ResidualInterface<T> for ProblemInterface<T, P> {
    fn compute_f(&mut self, x: &[T], f: &mut [T]) -> Result<(), NoxError> {
        assemble_residual(&mut self.fep, x, f)?;
        self.counters.residual += 1;
        Ok(())
    }
}

impl<T: Scalar, P: FeProblem<T>> JacobianInterface<T> for ProblemInterface<T, P> {
    fn compute_jacobian(&mut self, x: &[T]) -> Result<(), NoxError> {
        let n = self.fep.num_dofs();
        if x.len() != n {
            return Err(NoxError::DimensionMismatch { expected: n, found: x.len() });
        }
        let jac = self.jacobian.as_mut().ok_or(NoxError::MissingJacobian)?;
        if jac.nrows() != n {
            return Err(NoxError::DimensionMismatch { expected: n, found: jac.nrows() });
        }
        jac.zero();
        self.fep.assemble(x, AssemblyTarget::Jacobian(jac))?;
        jac.finish();
        self.counters.jacobian += 1;
        Ok(())
    }

    fn jacobian(&self) -> Option<&CsrMatrix<T>> {
        self.jacobian.as_ref()
    }
}

impl<T: Scalar, P: FeProblem<T>> PreconditionerInterface<T> for ProblemInterface<T, P> {
    fn compute_preconditioner(&mut self, x: &[T]) -> Result<&dyn Preconditioner<T>, NoxError> {
        let Some(mut pc) = self.precond.take() else {
            panic!("compute_preconditioner called without an attached preconditioner");
        };
        let built = self.compute_jacobian(x).and_then(|()| {
            let jac = self.jacobian.as_ref().ok_or(NoxError::MissingJacobian)?;
            pc.create(jac)?;
            pc.compute()
        });
        // reattach before reporting, a failed build keeps the handle
        let pc = self.precond.insert(pc);
        built?;
        self.counters.preconditioner += 1;
        Ok(pc.operator())
    }
}

impl<T: Scalar, P: FeProblem<T>> Drop for ProblemInterface<T, P> {
    fn drop(&mut self) {
        self.fep.invalidate_matrix();
    }
}
