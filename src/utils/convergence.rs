//! Convergence tracking & tolerance checks for the linear (Krylov) solvers.

/// Stopping criteria for one linear solve: relative residual tolerance and iteration cap.
#[derive(Clone, Copy, Debug)]
pub struct Convergence {
    pub tol: f64,
    pub max_iters: usize,
}

/// Outcome of one linear solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats {
    pub iterations: usize,
    /// ‖b − A x‖₂ at exit
    pub final_residual: f64,
    /// final_residual / ‖b − A x₀‖₂
    pub achieved_tol: f64,
    pub converged: bool,
}

impl Convergence {
    pub fn new(tol: f64, max_iters: usize) -> Self {
        Self { tol, max_iters }
    }

    /// Returns (should_stop, stats) given current `res_norm` and iteration `i`.
    pub fn check(&self, res_norm: f64, res0_norm: f64, i: usize) -> (bool, SolveStats) {
        let rel = relative(res_norm, res0_norm);
        let converged = rel <= self.tol;
        (
            converged || i >= self.max_iters,
            SolveStats { iterations: i, final_residual: res_norm, achieved_tol: rel, converged },
        )
    }
}

/// res / res0, with a zero initial residual counting as already solved.
pub fn relative(res_norm: f64, res0_norm: f64) -> f64 {
    if res0_norm > 0.0 { res_norm / res0_norm } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_on_tolerance_or_cap() {
        let c = Convergence::new(1e-3, 5);
        let (stop, s) = c.check(1e-4, 1.0, 2);
        assert!(stop && s.converged);
        let (stop, s) = c.check(0.5, 1.0, 5);
        assert!(stop && !s.converged);
        assert_eq!(s.achieved_tol, 0.5);
        let (stop, _) = c.check(0.5, 1.0, 3);
        assert!(!stop);
    }
}
