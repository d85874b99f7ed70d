//! Outer Newton iteration with a line search.
//!
//! Iteration 0 evaluates F(x₀) and checks the status test. Every further iteration sets up the
//! linear system, solves J s = −F to the direction's tolerance, picks a step with the line search,
//! evaluates the residual at the new iterate and checks the status test again. The loop ends on
//! the first status other than `Unconverged`.

use super::direction::NewtonDirection;
use super::linear_system::LinearSystem;
use crate::config::{LineSearch, OutputFlags};
use crate::core::Scalar;
use crate::core::wrappers::norm2;
use crate::error::NoxError;
use crate::problem::{FeProblem, ProblemInterface, ResidualInterface};
use crate::status::{SolverView, StatusTest, StatusType};

/// Result of one nonlinear solve.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonOutcome<T> {
    pub status: StatusType,
    /// Completed Newton steps
    pub n_iter: usize,
    /// ‖F‖₂ at the last iterate
    pub norm_f: f64,
    pub x: Vec<T>,
    /// Krylov iterations summed over all steps; `None` if no linear solve ran
    pub linear_iterations: Option<usize>,
    /// Achieved relative tolerance of the last linear solve
    pub achieved_tol: Option<f64>,
}

pub struct NewtonSolver<T: Scalar> {
    system: LinearSystem<T>,
    direction: NewtonDirection,
    line_search: LineSearch,
    tests: Box<dyn StatusTest<T>>,
    output: OutputFlags,
}

impl<T: Scalar> NewtonSolver<T> {
    pub fn new(
        system: LinearSystem<T>,
        direction: NewtonDirection,
        line_search: LineSearch,
        tests: Box<dyn StatusTest<T>>,
        output: OutputFlags,
    ) -> Self {
        Self { system, direction, line_search, tests, output }
    }

    /// Run Newton from `x0` until the status test is no longer `Unconverged`.
    pub fn solve<P: FeProblem<T>>(&mut self, iface: &mut ProblemInterface<T, P>, x0: Vec<T>) -> NewtonOutcome<T> {
        let n = x0.len();
        let mut out = NewtonOutcome {
            status: StatusType::Unevaluated,
            n_iter: 0,
            norm_f: f64::NAN,
            x: x0,
            linear_iterations: None,
            achieved_tol: None,
        };
        let mut f = vec![T::zero(); n];
        if let Err(e) = iface.compute_f(&out.x, &mut f) {
            log::error!("residual evaluation at the initial guess failed: {e}");
            out.status = StatusType::Failed;
            return out;
        }
        out.norm_f = norm2(&f);
        out.status = self.check(&out, None, &f);

        let mut x_prev = vec![T::zero(); n];
        let mut x_new = vec![T::zero(); n];
        let mut f_new = vec![T::zero(); n];
        let mut dx = vec![T::zero(); n];
        while out.status == StatusType::Unconverged {
            match self.step(iface, &mut out, &f, &mut dx, &mut x_new, &mut f_new) {
                Ok(step) => {
                    std::mem::swap(&mut x_prev, &mut out.x);
                    std::mem::swap(&mut out.x, &mut x_new);
                    std::mem::swap(&mut f, &mut f_new);
                    out.n_iter += 1;
                    out.norm_f = norm2(&f);
                    if self.output.contains(OutputFlags::OUTER_ITERATION) {
                        log::info!(
                            "-- Nonlinear Solver Step {} -- ||F|| = {:.3e}  step = {:.3e}",
                            out.n_iter,
                            out.norm_f,
                            step
                        );
                    }
                    out.status = self.check(&out, Some(&x_prev), &f);
                }
                Err(e) => {
                    log::error!("Newton step {} failed: {e}", out.n_iter + 1);
                    out.status = StatusType::Failed;
                }
            }
        }
        if self.output.contains(OutputFlags::OUTER_ITERATION) {
            log::info!("Newton solver finished: {} after {} steps, ||F|| = {:.3e}", out.status, out.n_iter, out.norm_f);
        }
        out
    }

    fn check(&mut self, out: &NewtonOutcome<T>, x_prev: Option<&[T]>, f: &[T]) -> StatusType {
        let view = SolverView { n_iter: out.n_iter, x: &out.x, x_prev, f, norm_f: out.norm_f };
        let status = self.tests.check_status(&view);
        if self.output.intersects(OutputFlags::OUTER_ITERATION_STATUS_TEST | OutputFlags::TEST_DETAILS) {
            log::info!("status after {} steps:\n{}", out.n_iter, self.tests.describe(2));
        }
        status
    }

    /// One Newton step from `out.x`; writes the new iterate and residual into `x_new` / `f_new`.
    fn step<P: FeProblem<T>>(
        &mut self,
        iface: &mut ProblemInterface<T, P>,
        out: &mut NewtonOutcome<T>,
        f: &[T],
        dx: &mut [T],
        x_new: &mut [T],
        f_new: &mut [T],
    ) -> Result<f64, NoxError> {
        let recompute = self.direction.needs_jacobian();
        self.system.setup(iface, &out.x, recompute)?;
        let tol = self.direction.linear_tolerance(out.norm_f);
        self.system.set_tolerance(tol);

        let rhs: Vec<T> = f.iter().map(|&v| -v).collect();
        dx.iter_mut().for_each(|v| *v = T::zero());
        let stats = self.system.solve(iface, &out.x, f, &rhs, dx)?;
        if !stats.converged {
            log::warn!(
                "linear solve did not reach {:.1e} in {} iterations (achieved {:.3e}); using the direction anyway",
                tol,
                stats.iterations,
                stats.achieved_tol
            );
        }
        if self.output.intersects(OutputFlags::LINEAR_SOLVER_DETAILS | OutputFlags::INNER_ITERATION) {
            log::info!(
                "{} solve: {} iterations, achieved tolerance {:.3e} (requested {:.1e})",
                self.system.ksp().kind,
                stats.iterations,
                stats.achieved_tol,
                tol
            );
        }
        *out.linear_iterations.get_or_insert(0) += stats.iterations;
        out.achieved_tol = Some(stats.achieved_tol);
        self.direction.record(out.norm_f, stats.final_residual);

        let (step, _) = self.line_search.search(iface, &out.x, dx, out.norm_f, x_new, f_new)?;
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Direction, LinearSolverOptions, NormType, ScaleType};
    use crate::matrix::PatternBuilder;
    use crate::nonlinear::PrecondSource;
    use crate::problem::AssemblyTarget;
    use crate::status::{Combo, ComboType, FiniteValue, MaxIters, NormF};
    use approx::assert_abs_diff_eq;

    /// F(x) = x³ − 8 componentwise
    struct Cubic {
        n: usize,
        matrix_free: bool,
    }

    impl FeProblem<f64> for Cubic {
        fn num_dofs(&self) -> usize {
            self.n
        }
        fn is_matrix_free(&self) -> bool {
            self.matrix_free
        }
        fn assemble(&mut self, x: &[f64], target: AssemblyTarget<'_, f64>) -> Result<(), NoxError> {
            match target {
                AssemblyTarget::Residual(f) => x.iter().zip(f.iter_mut()).for_each(|(xi, fi)| *fi += xi.powi(3) - 8.0),
                AssemblyTarget::Jacobian(j) => {
                    for (i, xi) in x.iter().enumerate() {
                        j.add(i, i, 3.0 * xi * xi)?;
                    }
                }
            }
            Ok(())
        }
        fn create_jacobian_structure(&mut self, _pattern: &mut PatternBuilder) {}
    }

    fn tests(abs: f64, max: usize) -> Box<dyn StatusTest<f64>> {
        let mut conv = Combo::new(ComboType::And);
        conv.add(Box::new(NormF::absolute(abs, NormType::Two, ScaleType::Scaled)));
        let mut top = Combo::new(ComboType::Or);
        top.add(Box::new(FiniteValue::new())).add(Box::new(conv)).add(Box::new(MaxIters::new(max)));
        Box::new(top)
    }

    fn newton(direction: Direction, matrix_free: bool, max: usize) -> NewtonSolver<f64> {
        let opts = LinearSolverOptions::default();
        let system = LinearSystem::new(matrix_free, PrecondSource::None, &opts, OutputFlags::ALL);
        NewtonSolver::new(system, NewtonDirection::new(direction, 1e-10), LineSearch::FullStep, tests(1e-10, max), OutputFlags::ALL)
    }

    #[test]
    fn converges_quadratically_to_the_cube_root() {
        let mut iface = ProblemInterface::new(Cubic { n: 3, matrix_free: false });
        let out = newton(Direction::default(), false, 20).solve(&mut iface, vec![3.0; 3]);
        assert_eq!(out.status, StatusType::Converged);
        assert!(out.n_iter <= 6);
        for xi in &out.x {
            assert_abs_diff_eq!(*xi, 2.0, epsilon = 1e-9);
        }
        assert!(out.linear_iterations.is_some());
    }

    #[test]
    fn matrix_free_newton_converges() {
        let mut iface = ProblemInterface::new(Cubic { n: 3, matrix_free: true });
        let out = newton(Direction::default(), true, 20).solve(&mut iface, vec![3.0; 3]);
        assert_eq!(out.status, StatusType::Converged);
        assert_eq!(iface.counters().jacobian, 0);
    }

    #[test]
    fn modified_newton_assembles_fewer_jacobians() {
        let mut full = ProblemInterface::new(Cubic { n: 2, matrix_free: false });
        let a = newton(Direction::default(), false, 50).solve(&mut full, vec![3.0; 2]);
        let mut modified = ProblemInterface::new(Cubic { n: 2, matrix_free: false });
        let b = newton(Direction::ModifiedNewton { max_age: 2 }, false, 50).solve(&mut modified, vec![3.0; 2]);
        assert_eq!(a.status, StatusType::Converged);
        assert_eq!(b.status, StatusType::Converged);
        assert!(modified.counters().jacobian < b.n_iter);
        assert_eq!(full.counters().jacobian, a.n_iter);
    }

    #[test]
    fn iteration_cap_fails() {
        let mut iface = ProblemInterface::new(Cubic { n: 2, matrix_free: false });
        let out = newton(Direction::default(), false, 1).solve(&mut iface, vec![10.0; 2]);
        assert_eq!(out.status, StatusType::Failed);
        assert_eq!(out.n_iter, 1);
    }

    #[test]
    fn converged_initial_guess_takes_no_step() {
        let mut iface = ProblemInterface::new(Cubic { n: 2, matrix_free: false });
        let out = newton(Direction::default(), false, 10).solve(&mut iface, vec![2.0; 2]);
        assert_eq!(out.status, StatusType::Converged);
        assert_eq!(out.n_iter, 0);
        assert_eq!(out.linear_iterations, None);
        assert_eq!(iface.counters().jacobian, 0);
    }
}
