//! Step length along the Newton direction.

use crate::config::LineSearch;
use crate::core::Scalar;
use crate::core::wrappers::norm2;
use crate::error::NoxError;
use crate::problem::ResidualInterface;

impl LineSearch {
    /// Backtracking with halving, at most 20 trial steps, down to λ = 1e-12.
    pub fn backtrack() -> Self {
        LineSearch::Backtrack { min_step: 1.0e-12, reduction: 0.5, max_iters: 20 }
    }

    /// Find λ, writing x + λ d into `x_new` and F(x + λ d) into `f_new`.
    ///
    /// Returns `(λ, ‖F(x + λ d)‖₂)`.
    pub fn search<T: Scalar, R: ResidualInterface<T> + ?Sized>(
        &self,
        residual: &mut R,
        x: &[T],
        dir: &[T],
        norm_f: f64,
        x_new: &mut [T],
        f_new: &mut [T],
    ) -> Result<(f64, f64), NoxError> {
        match *self {
            LineSearch::FullStep => {
                trial(residual, x, dir, 1.0, x_new, f_new)?;
                Ok((1.0, norm2(f_new)))
            }
            LineSearch::Backtrack { min_step, reduction, max_iters } => {
                let mut step = 1.0;
                for _ in 0..max_iters.max(1) {
                    trial(residual, x, dir, step, x_new, f_new)?;
                    let trial_norm = norm2(f_new);
                    if trial_norm.is_finite() && trial_norm < norm_f {
                        return Ok((step, trial_norm));
                    }
                    log::trace!("step {step:.3e} rejected: ||F|| = {trial_norm:.3e}");
                    step *= reduction;
                    if step < min_step {
                        break;
                    }
                }
                Err(NoxError::SolveError(format!("line search could not reduce ||F|| = {norm_f:.3e}")))
            }
        }
    }
}

fn trial<T: Scalar, R: ResidualInterface<T> + ?Sized>(
    residual: &mut R,
    x: &[T],
    dir: &[T],
    step: f64,
    x_new: &mut [T],
    f_new: &mut [T],
) -> Result<(), NoxError> {
    let s = T::from_real(step);
    for ((xn, &xi), &di) in x_new.iter_mut().zip(x).zip(dir) {
        *xn = xi + s * di;
    }
    residual.compute_f(x_new, f_new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// F(x) = atan(x), where the full Newton step overshoots far from the root
    struct Atan;

    impl ResidualInterface<f64> for Atan {
        fn compute_f(&mut self, x: &[f64], f: &mut [f64]) -> Result<(), NoxError> {
            f[0] = x[0].atan();
            Ok(())
        }
    }

    fn newton_dir(x: f64) -> f64 {
        -x.atan() * (1.0 + x * x)
    }

    #[test]
    fn full_step_takes_the_whole_direction() {
        let (mut xn, mut fnew) = ([0.0], [0.0]);
        let (step, norm) = LineSearch::FullStep.search(&mut Atan, &[3.0], &[newton_dir(3.0)], 3f64.atan(), &mut xn, &mut fnew).unwrap();
        assert_eq!(step, 1.0);
        assert!(norm > 3f64.atan());
    }

    #[test]
    fn backtracking_reduces_the_residual() {
        let x = 3.0;
        let (mut xn, mut fnew) = ([0.0], [0.0]);
        let (step, norm) =
            LineSearch::backtrack().search(&mut Atan, &[x], &[newton_dir(x)], x.atan(), &mut xn, &mut fnew).unwrap();
        assert!(step < 1.0);
        assert!(norm < x.atan());
        assert_abs_diff_eq!(xn[0], x + step * newton_dir(x));
    }

    #[test]
    fn backtracking_gives_up_on_an_ascent_direction() {
        let (mut xn, mut fnew) = ([0.0], [0.0]);
        let ls = LineSearch::Backtrack { min_step: 1e-3, reduction: 0.5, max_iters: 50 };
        assert!(ls.search(&mut Atan, &[1.0], &[1.0], 1f64.atan(), &mut xn, &mut fnew).is_err());
    }
}
