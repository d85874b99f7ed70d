//! Newton solver driver.
//!
//! [`NoxSolver`] owns a [`ProblemInterface`] around a finite-element problem and a [`NoxOptions`]
//! record. `solve()` resolves the configured kinds against what the problem supports, builds the
//! linear system and status tests, runs the Newton loop and keeps the run's results for the
//! accessors.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut nox = NoxSolver::new(problem);
//! nox.set_conv_abs_resid(1e-10);
//! nox.set_precond_kind("ML");
//! if nox.solve() {
//!     println!("{} iterations, |F| = {}", nox.num_iters(), nox.residual());
//! }
//! ```

use crate::config::{
    Direction, LineSearch, NormType, NoxOptions, OutputFlags, PrecReusePolicy, ScaleType,
};
use crate::context::ksp_context::LinearSolverKind;
use crate::context::pc_context::PreconditionerKind;
use crate::core::Scalar;
use crate::error::NoxError;
use crate::matrix::CoeffVector;
use crate::nonlinear::{LinearSystem, NewtonDirection, NewtonSolver, PrecondSource};
use crate::preconditioner::Precond;
use crate::problem::{FeProblem, ProblemInterface};
use crate::solver::gmres::Preconditioning;
use crate::status::{
    Combo, ComboType, FiniteValue, MaxIters, NormF, NormUpdate, NormWrms, StatusTest, StatusType,
};

/// Lifecycle of the driver.
///
/// `Running` marks a solve in progress. Every `solve()` returns with the driver in `Converged` or
/// `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveState {
    Unconfigured,
    Configured,
    Running,
    Converged,
    Failed,
}

pub struct NoxSolver<T: Scalar, P: FeProblem<T>> {
    interface: ProblemInterface<T, P>,
    options: NoxOptions,
    state: SolveState,
    num_iters: i64,
    residual: f64,
    num_lin_iters: i64,
    achieved_tol: f64,
    sln: Option<Vec<T>>,
}

impl<T: Scalar, P: FeProblem<T>> NoxSolver<T, P> {
    pub fn new(problem: P) -> Self {
        Self::with_options(problem, NoxOptions::default())
    }

    pub fn with_options(problem: P, options: NoxOptions) -> Self {
        Self {
            interface: ProblemInterface::new(problem),
            options,
            state: SolveState::Unconfigured,
            num_iters: -1,
            residual: 0.0,
            num_lin_iters: -1,
            achieved_tol: 0.0,
            sln: None,
        }
    }

    fn configured(&mut self) -> &mut NoxOptions {
        if self.state == SolveState::Unconfigured {
            self.state = SolveState::Configured;
        }
        &mut self.options
    }

    pub fn options(&self) -> &NoxOptions {
        &self.options
    }

    pub fn state(&self) -> SolveState {
        self.state
    }

    // ---- initial guess ----

    /// Copy the initial guess from a coefficient array.
    ///
    /// # Panics
    /// Panics if `values` does not hold exactly one value per DOF.
    pub fn set_init_sln(&mut self, values: &[T]) {
        self.interface.set_init_sln(values);
    }

    pub fn set_init_sln_vector(&mut self, v: &CoeffVector<T>) {
        self.interface.set_init_sln(v.as_slice());
    }

    // ---- preconditioner ----

    /// Attach a user preconditioner; enables preconditioning with kind `UserDefined`.
    pub fn set_precond(&mut self, pc: Box<dyn Precond<T>>) {
        self.interface.attach_preconditioner(pc);
        let o = self.configured();
        o.precond_enabled = true;
        o.precond_kind = PreconditionerKind::UserDefined;
    }

    /// Select a preconditioner by name ("None", "ML", "Ifpack", "User Defined").
    ///
    /// Unknown names are logged and fall back to no preconditioning.
    pub fn set_precond_kind(&mut self, name: &str) {
        match name.parse::<PreconditionerKind>() {
            Ok(kind) => self.set_precond_type(kind),
            Err(e) => {
                log::warn!("{e}; using no preconditioner");
                self.set_precond_type(PreconditionerKind::None);
            }
        }
    }

    pub fn set_precond_type(&mut self, kind: PreconditionerKind) {
        let o = self.configured();
        o.precond_enabled = kind != PreconditionerKind::None;
        o.precond_kind = kind;
    }

    pub fn set_precond_reuse(&mut self, policy: PrecReusePolicy, max_age: usize) {
        let o = self.configured();
        o.linear.reuse = policy;
        o.linear.max_age_of_prec = max_age;
    }

    // ---- nonlinear method ----

    pub fn set_direction(&mut self, direction: Direction) {
        self.configured().direction = direction;
    }

    /// "Newton" or "Modified-Newton".
    pub fn set_direction_name(&mut self, name: &str) -> Result<(), NoxError> {
        let d = name.parse()?;
        self.set_direction(d);
        Ok(())
    }

    pub fn set_line_search(&mut self, ls: LineSearch) {
        self.configured().line_search = ls;
    }

    pub fn set_output_flags(&mut self, flags: OutputFlags) {
        self.configured().output = flags;
    }

    // ---- linear solver ----

    pub fn set_linear_solver(&mut self, kind: LinearSolverKind) {
        self.configured().linear.kind = kind;
    }

    /// Select the linear solver by name ("GMRES", "CG", "BiCGStab", "LU").
    pub fn set_linear_solver_kind(&mut self, name: &str) -> Result<(), NoxError> {
        let kind = name.parse()?;
        self.set_linear_solver(kind);
        Ok(())
    }

    pub fn set_ls_max_iters(&mut self, iters: usize) {
        self.configured().linear.max_iters = iters;
    }

    pub fn set_ls_tolerance(&mut self, tol: f64) {
        self.configured().linear.tolerance = tol;
    }

    pub fn set_ls_sizeof_krylov_subspace(&mut self, size: usize) {
        self.configured().linear.krylov_size = size;
    }

    pub fn set_ls_preconditioning(&mut self, side: Preconditioning) {
        self.configured().linear.preconditioning = side;
    }

    // ---- convergence ----

    pub fn set_conv_iters(&mut self, iters: usize) {
        self.configured().conv.max_iters = iters;
    }

    pub fn set_conv_abs_resid(&mut self, tol: f64) {
        self.configured().conv.abs_resid = tol;
    }

    pub fn set_conv_rel_resid(&mut self, tol: f64) {
        let o = self.configured();
        o.conv_flags.rel_resid = true;
        o.conv.rel_resid = tol;
    }

    pub fn disable_rel_resid(&mut self) {
        self.configured().conv_flags.rel_resid = false;
    }

    pub fn set_conv_update(&mut self, tol: f64) {
        let o = self.configured();
        o.conv_flags.update = true;
        o.conv.update = tol;
    }

    pub fn disable_update(&mut self) {
        self.configured().conv_flags.update = false;
    }

    pub fn set_conv_wrms(&mut self, rtol: f64, atol: f64) {
        let o = self.configured();
        o.conv_flags.wrms = true;
        o.conv.wrms_rtol = rtol;
        o.conv.wrms_atol = atol;
    }

    pub fn disable_wrms(&mut self) {
        self.configured().conv_flags.wrms = false;
    }

    pub fn set_conv_norm(&mut self, norm: NormType, scale: ScaleType) {
        let o = self.configured();
        o.conv.norm_type = norm;
        o.conv.scale_type = scale;
    }

    // ---- results ----

    /// Newton iterations of the last solve, or -1 if it did not converge.
    pub fn num_iters(&self) -> i64 {
        self.num_iters
    }

    /// ‖F‖₂ at the converged solution.
    pub fn residual(&self) -> f64 {
        self.residual
    }

    /// Total linear iterations of the last solve; -1 if unknown.
    pub fn num_lin_iters(&self) -> i64 {
        self.num_lin_iters
    }

    /// Achieved tolerance of the last linear solve; 0.0 if unknown.
    pub fn achieved_tol(&self) -> f64 {
        self.achieved_tol
    }

    /// Converged solution of the last solve.
    pub fn sln(&self) -> Option<&[T]> {
        self.sln.as_deref()
    }

    pub fn init_sln(&self) -> &CoeffVector<T> {
        self.interface.init_sln()
    }

    pub fn problem(&self) -> &P {
        self.interface.fep()
    }

    pub fn problem_mut(&mut self) -> &mut P {
        self.interface.fep_mut()
    }

    pub fn interface(&self) -> &ProblemInterface<T, P> {
        &self.interface
    }

    /// Resolve the configured preconditioner against what the problem supports.
    fn resolve_precond(&self) -> PrecondSource<T> {
        let o = &self.options;
        if !o.precond_enabled {
            return PrecondSource::None;
        }
        let attached = self.interface.has_preconditioner();
        if self.interface.fep().is_matrix_free() {
            if attached {
                return PrecondSource::User;
            }
            if o.precond_kind.needs_matrix() {
                log::warn!("the {} preconditioner needs an assembled Jacobian, but the problem is matrix free; using none", o.precond_kind);
            } else {
                log::warn!("matrix-free problem without an attached preconditioner; using none");
            }
            return PrecondSource::None;
        }
        match o.precond_kind {
            PreconditionerKind::None => PrecondSource::None,
            PreconditionerKind::UserDefined if attached => PrecondSource::User,
            PreconditionerKind::UserDefined => {
                log::warn!("\"User Defined\" preconditioner selected but none is attached; using none");
                PrecondSource::None
            }
            kind => kind.build().map_or(PrecondSource::None, PrecondSource::Library),
        }
    }

    fn status_tests(&self) -> Box<dyn StatusTest<T>> {
        let (c, flags) = (&self.options.conv, &self.options.conv_flags);
        let mut converged = Combo::<T>::new(ComboType::And);
        converged.add(Box::new(NormF::absolute(c.abs_resid, c.norm_type, c.scale_type)));
        if flags.rel_resid {
            converged.add(Box::new(NormF::relative(c.rel_resid, c.norm_type, c.scale_type)));
        }
        if flags.update {
            converged.add(Box::new(NormUpdate::new(c.update, c.norm_type, c.scale_type)));
        }
        if flags.wrms {
            converged.add(Box::new(NormWrms::new(c.wrms_rtol, c.wrms_atol)));
        }
        let mut tests = Combo::<T>::new(ComboType::Or);
        tests
            .add(Box::new(FiniteValue::new()))
            .add(Box::new(converged))
            .add(Box::new(MaxIters::new(c.max_iters)));
        Box::new(tests)
    }

    fn fail(&mut self) -> bool {
        self.state = SolveState::Failed;
        false
    }

    /// Run Newton from the initial guess. Returns `true` on convergence.
    pub fn solve(&mut self) -> bool {
        self.num_iters = -1;
        self.residual = 0.0;
        self.num_lin_iters = -1;
        self.achieved_tol = 0.0;
        self.sln = None;
        self.state = SolveState::Running;

        let ndof = self.interface.ndof();
        if ndof == 0 {
            log::warn!("nothing to solve: the problem has no degrees of freedom");
            return self.fail();
        }
        let matrix_free = self.interface.fep().is_matrix_free();
        if matrix_free && self.options.linear.kind.needs_matrix() {
            log::error!("the {} solver needs an assembled Jacobian, but the problem is matrix free", self.options.linear.kind);
            return self.fail();
        }
        if self.interface.init_sln().len() != ndof {
            log::error!("initial guess has {} entries, the problem has {ndof} DOFs", self.interface.init_sln().len());
            return self.fail();
        }

        let precond = self.resolve_precond();
        let o = &self.options;
        if o.output.contains(OutputFlags::PARAMETERS) {
            log::info!(
                "Newton parameters: direction {:?}, line search {:?}, linear solver {} (tol {:.1e}, max {}, krylov {}), preconditioner {}, {}",
                o.direction,
                o.line_search,
                o.linear.kind,
                o.linear.tolerance,
                o.linear.max_iters,
                o.linear.krylov_size,
                precond.name(),
                if matrix_free { "matrix free" } else { "assembled Jacobian" }
            );
            log::info!("convergence: {:?} {:?}", o.conv, o.conv_flags);
        }

        let system = LinearSystem::new(matrix_free, precond, &o.linear, o.output);
        let direction = NewtonDirection::new(o.direction, o.linear.tolerance);
        let mut newton = NewtonSolver::new(system, direction, o.line_search, self.status_tests(), o.output);
        let x0 = self.interface.init_sln().extract();
        let out = newton.solve(&mut self.interface, x0);

        if out.status != StatusType::Converged {
            return self.fail();
        }
        self.num_iters = out.n_iter as i64;
        self.residual = out.norm_f;
        self.num_lin_iters = out.linear_iterations.map_or(-1, |n| n as i64);
        self.achieved_tol = out.achieved_tol.unwrap_or(0.0);
        let mut sln = vec![T::zero(); ndof];
        sln.copy_from_slice(&out.x);
        self.sln = Some(sln);
        self.state = SolveState::Converged;
        true
    }
}
