use super::{SolverView, StatusTest, StatusType};
use crate::core::Scalar;

/// Weighted root-mean-square update norm
/// `sqrt(1/n Σ (|Δxᵢ| / (rtol |xᵢ| + atol))²) < tol`.
#[derive(Debug, Clone)]
pub struct NormWrms {
    rtol: f64,
    atol: f64,
    tol: f64,
    value: f64,
    status: StatusType,
}

impl NormWrms {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol, tol: 1.0, value: f64::NAN, status: StatusType::Unevaluated }
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    fn wrms<T: Scalar>(&self, x: &[T], prev: &[T]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let sum: f64 = x
            .iter()
            .zip(prev)
            .map(|(&xi, &pi)| {
                let w = self.rtol * xi.modulus() + self.atol;
                ((xi - pi).modulus() / w).powi(2)
            })
            .sum();
        (sum / x.len() as f64).sqrt()
    }
}

impl<T: Scalar> StatusTest<T> for NormWrms {
    fn check_status(&mut self, view: &SolverView<'_, T>) -> StatusType {
        self.status = match view.x_prev {
            Some(prev) if view.n_iter > 0 => {
                self.value = self.wrms(view.x, prev);
                if self.value < self.tol { StatusType::Converged } else { StatusType::Unconverged }
            }
            _ => StatusType::Unconverged,
        };
        self.status
    }

    fn status(&self) -> StatusType {
        self.status
    }

    fn describe(&self, indent: usize) -> String {
        format!("{:indent$}{}: WRMS-Norm = {:.3e} < {:.3e}", "", self.status, self.value, self.tol)
    }
}
