use super::{SolverView, StatusTest, StatusType, scaled_norm};
use crate::config::{NormType, ScaleType};
use crate::core::Scalar;

/// ‖xₖ − xₖ₋₁‖ below a tolerance. Never converged at iteration 0.
#[derive(Debug, Clone)]
pub struct NormUpdate {
    tol: f64,
    ntype: NormType,
    stype: ScaleType,
    value: f64,
    status: StatusType,
}

impl NormUpdate {
    pub fn new(tol: f64, ntype: NormType, stype: ScaleType) -> Self {
        Self { tol, ntype, stype, value: f64::NAN, status: StatusType::Unevaluated }
    }
}

impl<T: Scalar> StatusTest<T> for NormUpdate {
    fn check_status(&mut self, view: &SolverView<'_, T>) -> StatusType {
        self.status = match view.x_prev {
            Some(prev) if view.n_iter > 0 => {
                let dx: Vec<T> = view.x.iter().zip(prev).map(|(&a, &b)| a - b).collect();
                self.value = scaled_norm(&dx, self.ntype, self.stype);
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
        format!("{:indent$}{}: Update-Norm = {:.3e} < {:.3e}", "", self.status, self.value, self.tol)
    }
}
