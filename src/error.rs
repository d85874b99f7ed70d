use thiserror::Error;

// Unified error type for fenox

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoxError {
    #[error("assembly error: {0}")]
    Assembly(String),
    #[error("no Jacobian has been preallocated for this problem")]
    MissingJacobian,
    #[error("entry ({row}, {col}) is outside the preallocated sparsity pattern")]
    OutsidePattern { row: usize, col: usize },
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("solve error: {0}")]
    SolveError(String),
    #[error("breakdown in {0}")]
    Breakdown(&'static str),
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("unknown linear solver `{0}`")]
    UnknownLinearSolver(String),
    #[error("unknown preconditioner `{0}`")]
    UnknownPreconditioner(String),
}
