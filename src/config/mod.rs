//! Solver configuration: option records, kinds and verbosity flags.

pub mod options;
pub use options::*;
