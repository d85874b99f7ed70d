//! End-to-end tests of the Newton driver on small finite-difference problems.
//!
//! These tests cover the linear and nonlinear reaction–diffusion model, the matrix-free path, the
//! named and user preconditioners, modified Newton, line searches, complex coefficients and the
//! failure modes (no DOFs, failing assembly, iteration cap, configuration mismatches).

mod common;

use approx::assert_abs_diff_eq;
use common::{Arctan, Helmholtz, Reaction};
use fenox::{
    Complex64, Direction, ForcingTerm, Jacobi, JacobianInterface, LineSearch, LinearSolverKind, NormType, NoxError,
    NoxSolver, PrecReusePolicy, PreconditionerKind, ScaleType, SolveState,
};

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

#[test]
fn linear_problem_converges_in_one_or_two_steps() {
    let mut nox = NoxSolver::new(Reaction::new(10, 0.0));
    assert_eq!(nox.state(), SolveState::Unconfigured);
    assert!(nox.solve());
    assert_eq!(nox.state(), SolveState::Converged);
    assert!((1..=2).contains(&nox.num_iters()));
    assert!(nox.residual() < 1e-6 * (10f64).sqrt());
    assert!(nox.num_lin_iters() >= 1);
    assert!(nox.achieved_tol() <= 1e-8);
    let sln = nox.sln().unwrap();
    assert_eq!(sln.len(), 10);
    assert!(max_abs(&nox.problem().residual(sln)) < 1e-5);
    // u = x(1 - x)/2 is reproduced exactly by central differences
    let h = 1.0 / 11.0;
    for (i, u) in sln.iter().enumerate() {
        let x = (i + 1) as f64 * h;
        assert_abs_diff_eq!(*u, 0.5 * x * (1.0 - x), epsilon = 1e-7);
    }
}

#[test]
fn nonlinear_problem_converges() {
    let mut nox = NoxSolver::new(Reaction::new(20, 50.0));
    nox.set_conv_abs_resid(1e-10);
    assert!(nox.solve());
    assert!(nox.num_iters() > 1);
    assert!(max_abs(&nox.problem().residual(nox.sln().unwrap())) < 1e-8);
}

#[test]
fn zero_dofs_fail_without_assembly() {
    let mut nox = NoxSolver::new(Reaction::new(0, 1.0));
    assert!(!nox.solve());
    assert_eq!(nox.num_iters(), -1);
    assert_eq!(nox.interface().counters(), Default::default());
    assert!(nox.sln().is_none());
}

#[test]
fn failing_assembly_fails_the_solve() {
    let mut nox = NoxSolver::new(Reaction::new(5, 1.0).failing());
    assert!(!nox.solve());
    assert_eq!(nox.num_iters(), -1);
    assert_eq!(nox.state(), SolveState::Failed);
    assert!(nox.sln().is_none());
}

#[test]
fn iteration_cap_is_a_failure() {
    let mut nox = NoxSolver::new(Reaction::new(10, 50.0));
    nox.set_conv_iters(1);
    nox.set_conv_abs_resid(1e-14);
    assert!(!nox.solve());
    assert_eq!(nox.num_iters(), -1);
}

#[test]
fn initial_guess_is_used() {
    let mut nox = NoxSolver::new(Reaction::new(10, 0.0));
    assert!(nox.solve());
    let exact = nox.sln().unwrap().to_vec();
    nox.set_init_sln(&exact);
    assert_eq!(nox.init_sln().extract(), exact);
    assert!(nox.solve());
    assert_eq!(nox.num_iters(), 0);
    assert_eq!(nox.num_lin_iters(), -1);
    assert_eq!(nox.achieved_tol(), 0.0);
}

#[test]
#[should_panic]
fn initial_guess_of_the_wrong_length_panics() {
    let mut nox = NoxSolver::new(Reaction::new(4, 0.0));
    nox.set_init_sln(&[0.0; 3]);
}

#[test]
fn unknown_preconditioner_name_falls_back_to_none() {
    let mut nox = NoxSolver::new(Reaction::new(10, 1.0));
    nox.set_precond_kind("Muelu");
    assert_eq!(nox.options().precond_kind, PreconditionerKind::None);
    assert!(!nox.options().precond_enabled);
    assert!(nox.solve());
}

#[test]
fn unknown_linear_solver_name_is_rejected() {
    let mut nox = NoxSolver::new(Reaction::new(10, 1.0));
    assert_eq!(
        nox.set_linear_solver_kind("Amesos"),
        Err(NoxError::UnknownLinearSolver("Amesos".into()))
    );
    assert_eq!(nox.options().linear.kind, LinearSolverKind::Gmres);
    nox.set_linear_solver_kind("bicgstab").unwrap();
    assert!(nox.solve());
}

#[test]
fn named_preconditioners_converge() {
    for name in ["ML", "Ifpack"] {
        let mut nox = NoxSolver::new(Reaction::new(60, 10.0));
        nox.set_precond_kind(name);
        nox.set_conv_abs_resid(1e-9);
        assert!(nox.solve(), "{name} failed");
        assert!(max_abs(&nox.problem().residual(nox.sln().unwrap())) < 1e-7);
    }
}

#[test]
fn preconditioning_cuts_linear_iterations() {
    let mut plain = NoxSolver::new(Reaction::new(40, 0.0));
    assert!(plain.solve());
    let mut ilu = NoxSolver::new(Reaction::new(40, 0.0));
    ilu.set_precond_kind("Ifpack");
    assert!(ilu.solve());
    assert!(ilu.num_lin_iters() < plain.num_lin_iters());
}

#[test]
fn user_preconditioner_is_rebuilt_through_the_interface() {
    let mut nox = NoxSolver::new(Reaction::new(20, 5.0));
    nox.set_precond(Box::new(Jacobi::new()));
    assert_eq!(nox.options().precond_kind, PreconditionerKind::UserDefined);
    assert!(nox.solve());
    let calls = nox.interface().counters();
    assert!(calls.preconditioner >= 1);
    assert_eq!(calls.preconditioner, nox.num_iters() as usize);
}

#[test]
fn user_defined_without_a_preconditioner_falls_back() {
    let mut nox = NoxSolver::new(Reaction::new(20, 5.0));
    nox.set_precond_kind("User Defined");
    assert!(nox.solve());
    assert_eq!(nox.interface().counters().preconditioner, 0);
}

#[test]
fn direct_solver_converges_linear_problem_in_one_step() {
    let mut nox = NoxSolver::new(Reaction::new(15, 0.0));
    nox.set_linear_solver(LinearSolverKind::Lu);
    assert!(nox.solve());
    assert_eq!(nox.num_iters(), 1);
}

#[test]
fn direct_solver_handles_larger_systems() {
    let mut nox = NoxSolver::new(Reaction::new(40, 0.0));
    nox.set_linear_solver(LinearSolverKind::Lu);
    assert!(nox.solve());
    assert_eq!(nox.num_iters(), 1);
    let h = 1.0 / 41.0;
    for (i, u) in nox.sln().unwrap().iter().enumerate() {
        let x = (i + 1) as f64 * h;
        assert_abs_diff_eq!(*u, 0.5 * x * (1.0 - x), epsilon = 1e-9);
    }

    let mut nox = NoxSolver::new(Reaction::new(64, 20.0));
    nox.set_linear_solver(LinearSolverKind::Lu);
    nox.set_conv_abs_resid(1e-10);
    assert!(nox.solve());
    assert!(max_abs(&nox.problem().residual(nox.sln().unwrap())) < 1e-8);
}

#[test]
fn multigrid_with_a_dense_coarse_level() {
    // 60 and 100 unknowns both coarsen once and end on a dense level of more than 16 unknowns
    for n in [60, 100] {
        let mut nox = NoxSolver::new(Reaction::new(n, 10.0));
        nox.set_precond_kind("ML");
        nox.set_conv_abs_resid(1e-9);
        assert!(nox.solve(), "ML failed at n = {n}");
        assert!(nox.num_lin_iters() >= 1);
        assert!(max_abs(&nox.problem().residual(nox.sln().unwrap())) < 1e-6);
    }
}

#[test]
fn reused_preconditioner_is_rebuilt_by_age() {
    let mut nox = NoxSolver::new(Reaction::new(20, 50.0));
    nox.set_precond(Box::new(Jacobi::new()));
    nox.set_precond_reuse(PrecReusePolicy::Reuse, 3);
    nox.set_conv_abs_resid(1e-10);
    assert!(nox.solve());
    let iters = nox.num_iters() as usize;
    assert!(iters > 1);
    let calls = nox.interface().counters();
    // rebuilt at steps 1, 4, 7, ...
    assert_eq!(calls.preconditioner, iters.div_ceil(3));
    assert!(calls.preconditioner < iters);
    // every Newton step still assembles a fresh Jacobian exactly once
    assert_eq!(calls.jacobian, iters);
}

#[test]
fn eisenstat_walker_forcing_converges() {
    let mut nox = NoxSolver::new(Reaction::new(30, 50.0));
    nox.set_direction(Direction::Newton { forcing: ForcingTerm::Type1 { min: 1e-6, max: 0.9 } });
    nox.set_conv_abs_resid(1e-10);
    nox.set_conv_iters(30);
    assert!(nox.solve());
    assert!(nox.num_iters() > 1);
    assert!(max_abs(&nox.problem().residual(nox.sln().unwrap())) < 1e-8);
}

#[test]
fn one_and_max_norms_drive_convergence() {
    let mut one = NoxSolver::new(Reaction::new(20, 10.0));
    one.set_conv_norm(NormType::One, ScaleType::Unscaled);
    one.set_conv_abs_resid(1e-8);
    assert!(one.solve());
    let f = one.problem().residual(one.sln().unwrap());
    assert!(f.iter().map(|v| v.abs()).sum::<f64>() < 1e-8);

    let mut max = NoxSolver::new(Reaction::new(20, 10.0));
    max.set_conv_norm(NormType::Max, ScaleType::Scaled);
    max.set_conv_abs_resid(1e-8);
    assert!(max.solve());
    assert!(max_abs(&max.problem().residual(max.sln().unwrap())) < 1e-8);
    assert!(one.num_iters() >= max.num_iters());
}

#[test]
fn absolute_test_stays_in_force_beside_a_loose_relative_one() {
    let mut loose = NoxSolver::new(Reaction::new(20, 10.0));
    loose.set_conv_rel_resid(0.5);
    loose.set_conv_abs_resid(1e-10);
    assert!(loose.solve());
    assert!(loose.residual() < 1e-10 * (20f64).sqrt());

    let mut rel_only = NoxSolver::new(Reaction::new(20, 10.0));
    rel_only.set_conv_rel_resid(0.5);
    rel_only.set_conv_abs_resid(1e3);
    assert!(rel_only.solve());
    assert!(rel_only.num_iters() < loose.num_iters());
}

#[test]
fn relative_test_accepts_an_exact_initial_guess() {
    let mut nox = NoxSolver::new(Arctan);
    nox.set_init_sln(&[0.0]);
    nox.set_conv_rel_resid(1e-8);
    assert!(nox.solve());
    assert_eq!(nox.num_iters(), 0);
    assert_eq!(nox.residual(), 0.0);
}

#[test]
fn state_settles_after_every_solve() {
    let mut nox = NoxSolver::new(Reaction::new(10, 50.0));
    nox.set_conv_iters(1);
    nox.set_conv_abs_resid(1e-14);
    assert_eq!(nox.state(), SolveState::Configured);
    assert!(!nox.solve());
    assert_eq!(nox.state(), SolveState::Failed);
    nox.set_conv_iters(20);
    nox.set_conv_abs_resid(1e-8);
    assert!(nox.solve());
    assert_eq!(nox.state(), SolveState::Converged);
    assert_ne!(nox.state(), SolveState::Running);
}

#[test]
fn matrix_free_newton_converges() {
    let mut nox = NoxSolver::new(Reaction::new(10, 0.0).matrix_free());
    assert!(nox.solve());
    assert!(nox.num_iters() <= 3);
    assert_eq!(nox.interface().counters().jacobian, 0);
    assert!(max_abs(&nox.problem().residual(nox.sln().unwrap())) < 1e-5);

    let mut nox = NoxSolver::new(Reaction::new(10, 20.0).matrix_free());
    nox.set_precond_kind("ML");
    assert!(nox.solve());
}

#[test]
fn matrix_free_with_an_attached_preconditioner() {
    let mut nox = NoxSolver::new(Reaction::new(30, 5.0).matrix_free());
    nox.set_precond(Box::new(Jacobi::new()));
    assert!(nox.interface().jacobian().is_some());
    assert!(nox.solve());
    assert!(nox.interface().counters().preconditioner >= 1);
}

#[test]
fn matrix_free_rejects_the_direct_solver() {
    let mut nox = NoxSolver::new(Reaction::new(10, 0.0).matrix_free());
    nox.set_linear_solver(LinearSolverKind::Lu);
    assert!(!nox.solve());
    assert_eq!(nox.interface().counters(), Default::default());
}

#[test]
fn modified_newton_reuses_the_jacobian() {
    let mut newton = NoxSolver::new(Reaction::new(20, 20.0));
    newton.set_conv_abs_resid(1e-10);
    assert!(newton.solve());
    assert_eq!(newton.interface().counters().jacobian, newton.num_iters() as usize);

    let mut modified = NoxSolver::new(Reaction::new(20, 20.0));
    modified.set_direction_name("Modified-Newton").unwrap();
    modified.set_conv_abs_resid(1e-10);
    modified.set_conv_iters(50);
    assert!(modified.solve());
    assert!(modified.interface().counters().jacobian < modified.num_iters() as usize);
    assert_eq!(modified.options().direction, Direction::ModifiedNewton { max_age: 2 });
}

#[test]
fn backtracking_rescues_a_diverging_newton() {
    let mut full = NoxSolver::new(Arctan);
    full.set_init_sln(&[3.0]);
    assert!(!full.solve());

    let mut damped = NoxSolver::new(Arctan);
    damped.set_init_sln(&[3.0]);
    damped.set_line_search(LineSearch::backtrack());
    assert!(damped.solve());
    assert_abs_diff_eq!(damped.sln().unwrap()[0], 0.0, epsilon = 1e-6);
}

#[test]
fn update_and_relative_tests_join_the_and_group() {
    let mut nox = NoxSolver::new(Reaction::new(10, 10.0));
    nox.set_conv_rel_resid(1e-8);
    nox.set_conv_update(1e-8);
    nox.set_conv_wrms(1e-6, 1e-10);
    assert!(nox.solve());
    let one_test = {
        let mut nox = NoxSolver::new(Reaction::new(10, 10.0));
        assert!(nox.solve());
        nox.num_iters()
    };
    assert!(nox.num_iters() >= one_test);
}

#[test]
fn complex_solution_is_extracted_exactly() {
    let mut nox = NoxSolver::new(Helmholtz { n: 12 });
    nox.set_conv_abs_resid(1e-12);
    assert!(nox.solve());
    let sln = nox.sln().unwrap();
    assert!(sln.iter().all(|z| z.im.abs() > 1e-6));
    let au = nox.problem().apply(sln);
    for v in au {
        assert_abs_diff_eq!(v.re, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(v.im, 0.0, epsilon = 1e-9);
    }
    let zero: Complex64 = Complex64::new(0.0, 0.0);
    assert!(sln.iter().all(|z| *z != zero));
}

#[test]
fn driver_teardown_invalidates_the_matrix() {
    let mut problem = Reaction::new(6, 1.0);
    {
        let mut nox = NoxSolver::<f64, _>::new(&mut problem);
        assert!(nox.solve());
    }
    assert!(problem.invalidated);
}
