use super::{SolverView, StatusTest, StatusType};
use crate::core::Scalar;

/// Fails as soon as ‖F‖ is NaN or infinite.
#[derive(Debug, Clone)]
pub struct FiniteValue {
    status: StatusType,
}

impl FiniteValue {
    pub fn new() -> Self {
        Self { status: StatusType::Unevaluated }
    }
}

impl Default for FiniteValue {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> StatusTest<T> for FiniteValue {
    fn check_status(&mut self, view: &SolverView<'_, T>) -> StatusType {
        self.status = if view.norm_f.is_finite() { StatusType::Unconverged } else { StatusType::Failed };
        self.status
    }

    fn status(&self) -> StatusType {
        self.status
    }

    fn describe(&self, indent: usize) -> String {
        format!("{:indent$}{}: Finite Number Check (2-Norm F)", "", self.status)
    }
}
