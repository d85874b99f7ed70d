use super::{SolverView, StatusTest, StatusType};
use crate::core::Scalar;

/// Fails once `max_iters` Newton steps have been taken.
#[derive(Debug, Clone)]
pub struct MaxIters {
    max_iters: usize,
    n_iter: usize,
    status: StatusType,
}

impl MaxIters {
    pub fn new(max_iters: usize) -> Self {
        Self { max_iters, n_iter: 0, status: StatusType::Unevaluated }
    }
}

impl<T: Scalar> StatusTest<T> for MaxIters {
    fn check_status(&mut self, view: &SolverView<'_, T>) -> StatusType {
        self.n_iter = view.n_iter;
        self.status = if view.n_iter >= self.max_iters { StatusType::Failed } else { StatusType::Unconverged };
        self.status
    }

    fn status(&self) -> StatusType {
        self.status
    }

    fn describe(&self, indent: usize) -> String {
        format!("{:indent$}{}: Number of Iterations = {} < {}", "", self.status, self.n_iter, self.max_iters)
    }
}
