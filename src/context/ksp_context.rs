//! Factory for the linear solver used inside each Newton step.
//!
//! [`KspContext`] holds the selected [`LinearSolverKind`] together with its tolerance, iteration
//! cap and restart length, and dispatches `solve_context` to the matching solver. The tolerance is
//! public so the Newton direction can tighten or relax it between steps (forcing terms).

use crate::config::LinearSolverOptions;
use crate::core::{LinearOperator, Scalar};
use crate::error::NoxError;
use crate::preconditioner::Preconditioner;
use crate::solver::gmres::Preconditioning;
use crate::solver::{BiCgStabSolver, CgSolver, GmresSolver, LinearSolver, LuSolver};
use crate::utils::convergence::SolveStats;
use std::fmt;
use std::str::FromStr;

/// Available linear solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearSolverKind {
    /// Restarted GMRES
    #[default]
    Gmres,
    /// Conjugate Gradient (Hermitian positive definite systems)
    Cg,
    /// BiConjugate Gradient Stabilized
    BiCgStab,
    /// Dense direct LU of the assembled Jacobian
    Lu,
}

impl LinearSolverKind {
    /// Whether the solver needs the Jacobian as an assembled matrix.
    pub fn needs_matrix(self) -> bool {
        self == LinearSolverKind::Lu
    }
}

impl FromStr for LinearSolverKind {
    type Err = NoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gmres" => Ok(LinearSolverKind::Gmres),
            "cg" => Ok(LinearSolverKind::Cg),
            "bicgstab" => Ok(LinearSolverKind::BiCgStab),
            "lu" | "direct" => Ok(LinearSolverKind::Lu),
            _ => Err(NoxError::UnknownLinearSolver(s.to_string())),
        }
    }
}

impl fmt::Display for LinearSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinearSolverKind::Gmres => "GMRES",
            LinearSolverKind::Cg => "CG",
            LinearSolverKind::BiCgStab => "BiCGStab",
            LinearSolverKind::Lu => "LU",
        };
        f.write_str(name)
    }
}

/// Context and configuration for the linear solver.
#[derive(Debug, Clone, PartialEq)]
pub struct KspContext {
    /// The type of solver to use
    pub kind: LinearSolverKind,
    /// Relative residual tolerance
    pub tol: f64,
    /// Maximum number of iterations
    pub max_it: usize,
    /// Restart parameter (GMRES)
    pub restart: usize,
    /// Preconditioning side (GMRES)
    pub side: Preconditioning,
}

impl KspContext {
    pub fn new(kind: LinearSolverKind, tol: f64, max_it: usize) -> Self {
        Self { kind, tol, max_it, restart: 50, side: Preconditioning::Right }
    }

    /// Solve `A x = b` with the configured solver and preconditioner.
    ///
    /// `x` holds the initial guess on entry and the solution on exit.
    pub fn solve_context<T: Scalar>(
        &self,
        a: &dyn LinearOperator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats, NoxError> {
        match self.kind {
            LinearSolverKind::Gmres => {
                let mut solver = GmresSolver::new(self.restart, self.tol, self.max_it).with_preconditioning(self.side);
                solver.solve(a, pc, b, x)
            }
            LinearSolverKind::Cg => CgSolver::new(self.tol, self.max_it).solve(a, pc, b, x),
            LinearSolverKind::BiCgStab => BiCgStabSolver::new(self.tol, self.max_it).solve(a, pc, b, x),
            // the factorization is exact; the preconditioner is not used
            LinearSolverKind::Lu => LuSolver::new().solve(a, None, b, x),
        }
    }
}

impl From<&LinearSolverOptions> for KspContext {
    fn from(o: &LinearSolverOptions) -> Self {
        Self {
            kind: o.kind,
            tol: o.tolerance,
            max_it: o.max_iters,
            restart: o.krylov_size,
            side: o.preconditioning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preconditioner::Jacobi;
    use crate::preconditioner::Precond;
    use crate::solver::test_matrices::{nonsym4, spd3};
    use approx::assert_abs_diff_eq;

    #[test]
    fn every_kind_solves_a_small_system() {
        let (a, b, x_true) = spd3();
        for kind in [LinearSolverKind::Gmres, LinearSolverKind::Cg, LinearSolverKind::BiCgStab, LinearSolverKind::Lu] {
            let ksp = KspContext::new(kind, 1e-12, 100);
            let mut x = vec![0.0; 3];
            let stats = ksp.solve_context(&a, None, &b, &mut x).unwrap();
            assert!(stats.converged, "{kind} did not converge");
            for i in 0..3 {
                assert_abs_diff_eq!(x[i], x_true[i], epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn preconditioned_gmres_from_options() {
        let (a, b, _) = nonsym4();
        let mut pc = Jacobi::new();
        pc.create(&a).unwrap();
        let ksp = KspContext::from(&LinearSolverOptions::default());
        let mut x = vec![0.0; 4];
        let stats = ksp.solve_context(&a, Some(pc.operator()), &b, &mut x).unwrap();
        assert!(stats.converged);
    }

    #[test]
    fn solver_names() {
        assert_eq!("BiCGStab".parse::<LinearSolverKind>().unwrap(), LinearSolverKind::BiCgStab);
        assert_eq!("gmres".parse::<LinearSolverKind>().unwrap(), LinearSolverKind::Gmres);
        assert!(matches!("Amesos".parse::<LinearSolverKind>(), Err(NoxError::UnknownLinearSolver(_))));
    }
}
