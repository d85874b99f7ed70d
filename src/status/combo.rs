use super::{SolverView, StatusTest, StatusType};
use crate::core::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboType {
    /// Converged only when every member has converged; any failure fails the group.
    And,
    /// The first member (in insertion order) that is not unconverged decides.
    Or,
}

/// Composite of status tests. Every member is evaluated on every check.
pub struct Combo<T: Scalar> {
    kind: ComboType,
    tests: Vec<Box<dyn StatusTest<T>>>,
    status: StatusType,
}

impl<T: Scalar> Combo<T> {
    pub fn new(kind: ComboType) -> Self {
        Self { kind, tests: Vec::new(), status: StatusType::Unevaluated }
    }

    pub fn add(&mut self, test: Box<dyn StatusTest<T>>) -> &mut Self {
        self.tests.push(test);
        self
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl<T: Scalar> StatusTest<T> for Combo<T> {
    fn check_status(&mut self, view: &SolverView<'_, T>) -> StatusType {
        let results: Vec<StatusType> = self.tests.iter_mut().map(|t| t.check_status(view)).collect();
        self.status = match self.kind {
            ComboType::Or => results
                .into_iter()
                .find(|s| *s != StatusType::Unconverged)
                .unwrap_or(StatusType::Unconverged),
            ComboType::And => {
                if results.contains(&StatusType::Failed) {
                    StatusType::Failed
                } else if !results.is_empty() && results.iter().all(|s| *s == StatusType::Converged) {
                    StatusType::Converged
                } else {
                    StatusType::Unconverged
                }
            }
        };
        self.status
    }

    fn status(&self) -> StatusType {
        self.status
    }

    fn describe(&self, indent: usize) -> String {
        let mut out = format!("{:indent$}{}: {:?} Combination ->", "", self.status, self.kind);
        for t in &self.tests {
            out.push('\n');
            out.push_str(&t.describe(indent + 2));
        }
        out
    }
}
