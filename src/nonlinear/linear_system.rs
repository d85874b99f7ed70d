//! The linear system solved at each Newton step, J(x) s = −F(x).
//!
//! Owns the linear solver configuration and the preconditioner lifecycle. The Jacobian is either
//! the assembled matrix held by the problem interface or a finite-difference operator built on
//! the fly (matrix-free mode).

use super::matrix_free::MatrixFree;
use crate::config::{LinearSolverOptions, OutputFlags, PrecReusePolicy};
use crate::context::ksp_context::KspContext;
use crate::core::Scalar;
use crate::error::NoxError;
use crate::preconditioner::{Precond, Preconditioner};
use crate::problem::{FeProblem, JacobianInterface, PreconditionerInterface, ProblemInterface};
use crate::utils::convergence::SolveStats;

/// Where the preconditioner of the linear solve comes from.
pub enum PrecondSource<T> {
    None,
    /// Built by the library from the assembled Jacobian (ML, Ifpack).
    Library(Box<dyn Precond<T>>),
    /// The preconditioner attached to the problem interface.
    User,
}

impl<T> PrecondSource<T> {
    pub fn name(&self) -> &'static str {
        match self {
            PrecondSource::None => "None",
            PrecondSource::Library(_) => "Library",
            PrecondSource::User => "User Defined",
        }
    }
}

pub struct LinearSystem<T: Scalar> {
    matrix_free: bool,
    precond: PrecondSource<T>,
    ksp: KspContext,
    reuse: PrecReusePolicy,
    max_age_of_prec: usize,
    prec_age: Option<usize>,
    output: OutputFlags,
}

impl<T: Scalar> LinearSystem<T> {
    pub fn new(matrix_free: bool, precond: PrecondSource<T>, opts: &LinearSolverOptions, output: OutputFlags) -> Self {
        Self {
            matrix_free,
            precond,
            ksp: KspContext::from(opts),
            reuse: opts.reuse,
            max_age_of_prec: opts.max_age_of_prec,
            prec_age: None,
            output,
        }
    }

    pub fn is_matrix_free(&self) -> bool {
        self.matrix_free
    }

    pub fn ksp(&self) -> &KspContext {
        &self.ksp
    }

    /// Relative tolerance of the next linear solve.
    pub fn set_tolerance(&mut self, tol: f64) {
        self.ksp.tol = tol;
    }

    fn precond_due(&self, jacobian_changed: bool) -> bool {
        match (self.prec_age, self.reuse) {
            (None, _) => true,
            (Some(_), PrecReusePolicy::Rebuild) => jacobian_changed,
            (Some(age), PrecReusePolicy::Reuse) => age >= self.max_age_of_prec,
        }
    }

    /// Bring the Jacobian and preconditioner up to date at `x`.
    pub fn setup<P: FeProblem<T>>(
        &mut self,
        iface: &mut ProblemInterface<T, P>,
        x: &[T],
        recompute_jacobian: bool,
    ) -> Result<(), NoxError> {
        let rebuild_pc = !matches!(self.precond, PrecondSource::None) && self.precond_due(recompute_jacobian);
        // the user preconditioner assembles the Jacobian itself
        let user_assembles = rebuild_pc && matches!(self.precond, PrecondSource::User);
        if !self.matrix_free && recompute_jacobian && !user_assembles {
            iface.compute_jacobian(x)?;
            if self.output.contains(OutputFlags::DETAILS) {
                log::debug!("Jacobian recomputed");
            }
        }
        if !rebuild_pc {
            self.prec_age = self.prec_age.map(|a| a + 1);
            return Ok(());
        }
        match &mut self.precond {
            PrecondSource::None => {}
            PrecondSource::Library(pc) => {
                let jac = iface.jacobian().ok_or(NoxError::MissingJacobian)?;
                pc.create(jac)?;
                pc.compute()?;
            }
            PrecondSource::User => {
                iface.compute_preconditioner(x)?;
            }
        }
        if self.output.contains(OutputFlags::DETAILS) {
            log::debug!("{} preconditioner rebuilt", self.precond.name());
        }
        self.prec_age = Some(1);
        Ok(())
    }

    /// Solve J(x) dx = rhs, with `fx = F(x)`. `dx` holds the initial guess on entry.
    pub fn solve<P: FeProblem<T>>(
        &self,
        iface: &mut ProblemInterface<T, P>,
        x: &[T],
        fx: &[T],
        rhs: &[T],
        dx: &mut [T],
    ) -> Result<SolveStats, NoxError> {
        if self.matrix_free {
            let (mut residual, user_pc) = iface.matrix_free_parts();
            let pc = self.operator(user_pc);
            let op = MatrixFree::new(&mut residual, x, fx);
            self.ksp.solve_context(&op, pc, rhs, dx)
        } else {
            let pc = self.operator(iface.precond_operator());
            let jac = iface.jacobian().ok_or(NoxError::MissingJacobian)?;
            self.ksp.solve_context(jac, pc, rhs, dx)
        }
    }

    fn operator<'a>(&'a self, user: Option<&'a dyn Preconditioner<T>>) -> Option<&'a dyn Preconditioner<T>> {
        match &self.precond {
            PrecondSource::None => None,
            PrecondSource::Library(pc) => Some(pc.operator()),
            PrecondSource::User => user,
        }
    }
}
