//! Newton and modified-Newton search directions.
//!
//! The direction decides, per step, whether the Jacobian must be recomputed and which relative
//! tolerance the inner linear solve gets. Eisenstat–Walker choice 1 sets
//! ηₖ = |‖F(xₖ)‖ − ‖F(xₖ₋₁) + J sₖ₋₁‖| / ‖F(xₖ₋₁)‖ with the usual safeguard against dropping
//! too fast.

use crate::config::{Direction, ForcingTerm};

const GOLDEN: f64 = 1.618_033_988_749_895;

#[derive(Debug, Clone)]
pub struct NewtonDirection {
    direction: Direction,
    base_tol: f64,
    /// Steps since the Jacobian was last computed (modified Newton)
    jac_age: Option<usize>,
    eta: f64,
    prev_norm_f: Option<f64>,
    prev_linear_residual: Option<f64>,
}

impl NewtonDirection {
    pub fn new(direction: Direction, base_tol: f64) -> Self {
        Self { direction, base_tol, jac_age: None, eta: base_tol, prev_norm_f: None, prev_linear_residual: None }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether this step must rebuild the Jacobian. Advances the Jacobian age.
    pub fn needs_jacobian(&mut self) -> bool {
        match self.direction {
            Direction::Newton { .. } => true,
            Direction::ModifiedNewton { max_age } => match self.jac_age {
                Some(age) if age < max_age => {
                    self.jac_age = Some(age + 1);
                    false
                }
                _ => {
                    self.jac_age = Some(1);
                    true
                }
            },
        }
    }

    /// Relative tolerance for this step's linear solve.
    pub fn linear_tolerance(&mut self, norm_f: f64) -> f64 {
        let (min, max) = match self.direction {
            Direction::Newton { forcing: ForcingTerm::Type1 { min, max } } => (min, max),
            _ => return self.base_tol,
        };
        if let (Some(prev_f), Some(lin)) = (self.prev_norm_f, self.prev_linear_residual) {
            let mut eta = if prev_f > 0.0 { (norm_f - lin).abs() / prev_f } else { max };
            let guard = self.eta.powf(GOLDEN);
            if guard > 0.1 {
                eta = eta.max(guard);
            }
            self.eta = eta.clamp(min, max);
        }
        self.eta
    }

    /// Remember ‖F‖ at the start of the step and the final linear residual ‖F + J s‖.
    pub fn record(&mut self, norm_f: f64, linear_residual: f64) {
        self.prev_norm_f = Some(norm_f);
        self.prev_linear_residual = Some(linear_residual);
    }
}
