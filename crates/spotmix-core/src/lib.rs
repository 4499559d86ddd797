pub mod alternate;
pub mod builder;
pub mod classify;
pub mod driver;
pub mod error;
pub mod instance;
pub mod interpolate;
pub mod record;
pub mod report;

pub use alternate::{AlternatePoint, AuxiliaryOutcome, PointSource, auxiliary_point, bounded_resolve};
pub use builder::{AllocationModel, ModelVariant, build};
pub use classify::{Classification, classify};
pub use driver::{DerivedTotals, PrimalResult, SolveDriver, solve};
pub use error::{AnalysisError, Stage};
pub use instance::ProblemDefinition;
pub use interpolate::{DEFAULT_LAMBDA, combine};
pub use record::{SolutionVector, VariableRecord, is_zero, round4};
pub use report::{TextReport, render_text};

#[cfg(test)]
mod fixtures;
