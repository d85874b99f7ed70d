//! Preconditioner selection for the Newton solver.
//!
//! The driver names its preconditioner with a [`PreconditionerKind`]. `Ml` and `Ifpack` are built
//! here from the assembled Jacobian (smoothed-aggregation AMG and ILU(0) respectively). `UserDefined` defers
//! to the preconditioner object attached to the problem interface, and `None` runs the linear
//! solver unpreconditioned.
//!
//! # Example
//!
//! ```rust
//! use fenox::context::pc_context::PreconditionerKind;
//! let kind: PreconditionerKind = "ml".parse().unwrap();
//! assert_eq!(kind, PreconditionerKind::Ml);
//! ```

use crate::core::Scalar;
use crate::error::NoxError;
use crate::preconditioner::{Amg, Ilu0, Precond};
use std::fmt;
use std::str::FromStr;

/// Closed set of preconditioner kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreconditionerKind {
    #[default]
    None,
    /// Algebraic multigrid built from the assembled Jacobian.
    Ml,
    /// Incomplete LU with zero fill-in built from the assembled Jacobian.
    Ifpack,
    /// The preconditioner attached to the problem interface.
    UserDefined,
}

impl PreconditionerKind {
    /// Library preconditioner for this kind, if the library builds one itself.
    pub fn build<T: Scalar>(self) -> Option<Box<dyn Precond<T>>> {
        match self {
            PreconditionerKind::Ml => Some(Box::new(Amg::<T>::new())),
            PreconditionerKind::Ifpack => Some(Box::new(Ilu0::<T>::new())),
            PreconditionerKind::None | PreconditionerKind::UserDefined => None,
        }
    }

    /// Whether this kind needs an assembled Jacobian to build from.
    pub fn needs_matrix(self) -> bool {
        matches!(self, PreconditionerKind::Ml | PreconditionerKind::Ifpack)
    }
}

impl FromStr for PreconditionerKind {
    type Err = NoxError;

    /// Case-insensitive: "None", "ML", "Ifpack", "User Defined".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(PreconditionerKind::None),
            "ml" => Ok(PreconditionerKind::Ml),
            "ifpack" => Ok(PreconditionerKind::Ifpack),
            "user defined" | "user-defined" | "userdefined" => Ok(PreconditionerKind::UserDefined),
            _ => Err(NoxError::UnknownPreconditioner(s.to_string())),
        }
    }
}

impl fmt::Display for PreconditionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreconditionerKind::None => "None",
            PreconditionerKind::Ml => "ML",
            PreconditionerKind::Ifpack => "Ifpack",
            PreconditionerKind::UserDefined => "User Defined",
        };
        f.write_str(name)
    }
}
