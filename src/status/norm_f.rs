use super::{SolverView, StatusTest, StatusType, scaled_norm};
use crate::config::{NormType, ScaleType};
use crate::core::Scalar;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tolerance {
    Absolute(f64),
    /// Relative to ‖F(x₀)‖, captured at the first check.
    Relative { rel: f64, reference: Option<f64> },
}

/// ‖F‖ below a tolerance.
#[derive(Debug, Clone)]
pub struct NormF {
    tol: Tolerance,
    ntype: NormType,
    stype: ScaleType,
    value: f64,
    status: StatusType,
}

impl NormF {
    pub fn absolute(tol: f64, ntype: NormType, stype: ScaleType) -> Self {
        Self::with(Tolerance::Absolute(tol), ntype, stype)
    }

    pub fn relative(rel: f64, ntype: NormType, stype: ScaleType) -> Self {
        Self::with(Tolerance::Relative { rel, reference: None }, ntype, stype)
    }

    fn with(tol: Tolerance, ntype: NormType, stype: ScaleType) -> Self {
        Self { tol, ntype, stype, value: f64::NAN, status: StatusType::Unevaluated }
    }

    /// Tolerance currently in force.
    pub fn tolerance(&self) -> f64 {
        match self.tol {
            Tolerance::Absolute(t) => t,
            Tolerance::Relative { rel, reference: Some(r) } => rel * r,
            Tolerance::Relative { reference: None, .. } => f64::NAN,
        }
    }

    pub fn norm(&self) -> f64 {
        self.value
    }
}

impl<T: Scalar> StatusTest<T> for NormF {
    fn check_status(&mut self, view: &SolverView<'_, T>) -> StatusType {
        self.value = scaled_norm(view.f, self.ntype, self.stype);
        if let Tolerance::Relative { reference, .. } = &mut self.tol {
            if reference.is_none() || view.n_iter == 0 {
                *reference = Some(self.value);
            }
        }
        // an exact zero passes even when a zero reference makes the relative tolerance 0
        self.status = if self.value < self.tolerance() || self.value == 0.0 {
            StatusType::Converged
        } else {
            StatusType::Unconverged
        };
        self.status
    }

    fn status(&self) -> StatusType {
        self.status
    }

    fn describe(&self, indent: usize) -> String {
        let kind = match self.tol {
            Tolerance::Absolute(_) => "Absolute",
            Tolerance::Relative { .. } => "Relative",
        };
        format!(
            "{:indent$}{}: F-Norm = {:.3e} < {:.3e} ({kind})",
            "",
            self.status,
            self.value,
            self.tolerance()
        )
    }
}
